//! Plain-text rendering of the dashboard

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write;

use nerkh_core::PriceAsset;

use crate::app::{AppState, NotificationLevel, ViewMode};

/// Iran Standard Time, no daylight saving
const TEHRAN_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

const CARD_WIDTH: usize = 26;
const CARDS_PER_ROW: usize = 4;

/// `58750000` -> `58,750,000`
pub fn format_toman(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Signed, two decimals
pub fn format_percent(value: f64) -> String {
    // Folds -0.0 into +0.0
    let value = value + 0.0;
    if value >= 0.0 {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

/// Wall-clock time in Tehran
pub fn format_clock(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(TEHRAN_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format("%H:%M:%S").to_string(),
        None => at.format("%H:%M:%S UTC").to_string(),
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.chars().take(width).collect()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

/// Scrolling strip: symbol, price and change for every asset
pub fn ticker_line(assets: &[PriceAsset]) -> String {
    assets
        .iter()
        .map(|a| {
            format!(
                "{} {} {}",
                a.symbol,
                format_toman(a.price_toman),
                format_percent(a.change_24h)
            )
        })
        .collect::<Vec<_>>()
        .join("  |  ")
}

fn card_lines(asset: &PriceAsset) -> [String; 5] {
    let inner = CARD_WIDTH - 4;
    let marker = if asset.is_fallback() { "*" } else { " " };
    [
        format!("+{}+", "-".repeat(CARD_WIDTH - 2)),
        format!("| {} |", pad(&format!("{}{} {}", asset.symbol, marker, asset.name_fa), inner)),
        format!("| {} |", pad(&format!("{} T", format_toman(asset.price_toman)), inner)),
        format!(
            "| {} |",
            pad(&format!("{}  {}", format_percent(asset.change_24h), asset.source), inner)
        ),
        format!("+{}+", "-".repeat(CARD_WIDTH - 2)),
    ]
}

/// Cards laid out side by side, `CARDS_PER_ROW` per row
pub fn render_cards(assets: &[&PriceAsset]) -> String {
    let mut out = String::new();
    for row in assets.chunks(CARDS_PER_ROW) {
        let cards: Vec<_> = row.iter().map(|a| card_lines(a)).collect();
        for line in 0..5 {
            let joined: Vec<&str> = cards.iter().map(|c| c[line].as_str()).collect();
            out.push_str(joined.join(" ").trim_end());
            out.push('\n');
        }
    }
    out
}

/// List view
pub fn render_table(assets: &[PriceAsset]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<28} {:>18} {:>9}  {:<10} {:<8}",
        "Asset", "Price (Toman)", "24h", "Source", "Updated"
    );
    let _ = writeln!(out, "{}", "-".repeat(78));

    for asset in assets {
        let name = format!("{} ({})", asset.name_fa, asset.symbol);
        let source = if asset.is_fallback() {
            format!("{}*", asset.source)
        } else {
            asset.source.clone()
        };
        let _ = writeln!(
            out,
            "{} {:>18} {:>9}  {} {}",
            pad(&name, 28),
            format_toman(asset.price_toman),
            format_percent(asset.change_24h),
            pad(&source, 10),
            format_clock(asset.last_updated)
        );
    }
    out
}

/// Whole screen for the current state
pub fn render_dashboard(state: &AppState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", ticker_line(state.assets()));
    let _ = writeln!(out);

    let updated = state
        .last_updated
        .map_or_else(|| "-".to_string(), format_clock);
    let mut header = format!("Nerkh market rates | last update {}", updated);
    if state.loading {
        header.push_str(" [refreshing]");
    }
    if state.using_cached {
        header.push_str(" [cached 30m]");
    }
    if state.fallback_mode {
        header.push_str(" [fallback]");
    }
    let _ = writeln!(out, "{}", header);

    if state.fallback_mode {
        let _ = writeln!(out);
        let _ = writeln!(out, "! Direct access to the primary price source is unavailable.");
        let _ = writeln!(
            out,
            "! USD is derived from USDT (nobitex); entries marked * are approximate."
        );
    }

    if state.assets().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No prices loaded.");
        return out;
    }

    let _ = writeln!(out);
    out.push_str(&render_cards(&state.high_priority()));

    let sorted = state.sorted_assets();
    let _ = writeln!(out);
    match state.view_mode {
        ViewMode::List => out.push_str(&render_table(&sorted)),
        ViewMode::Grid => out.push_str(&render_cards(&sorted.iter().collect::<Vec<_>>())),
    }

    if !state.alerts.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Alerts:");
        let triggered = state.triggered_alerts();
        for alert in &state.alerts {
            let hit = triggered.iter().any(|(a, _)| a.id == alert.id);
            let _ = writeln!(
                out,
                "  {} {} {} {}{}",
                &alert.id.to_string()[..8],
                alert.asset_id,
                alert.direction,
                format_toman(alert.threshold_toman),
                if hit { "  TRIGGERED" } else { "" }
            );
        }
    }

    out
}

/// Notification line, prefixed by level
pub fn render_notification(level: NotificationLevel, message: &str) -> String {
    match level {
        NotificationLevel::Info => format!("[info] {}", message),
        NotificationLevel::Error => format!("[error] {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerkh_core::{AssetType, PriceOrigin};
    use nerkh_price_feed::{FetchReport, PriceSnapshot};

    fn asset(id: &str, symbol: &str, price: u64, change: f64, origin: PriceOrigin) -> PriceAsset {
        PriceAsset {
            id: id.to_string(),
            asset_type: AssetType::Currency,
            name_fa: id.to_string(),
            symbol: symbol.to_string(),
            price_toman: price,
            change_24h: change,
            source: "brsapi".to_string(),
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            origin,
        }
    }

    #[test]
    fn test_format_toman() {
        assert_eq!(format_toman(0), "0");
        assert_eq!(format_toman(999), "999");
        assert_eq!(format_toman(1_000), "1,000");
        assert_eq!(format_toman(58_750_000), "58,750,000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(0.0), "+0.00%");
        assert_eq!(format_percent(-0.5), "-0.50%");
        assert_eq!(format_percent(-0.0), "+0.00%");
        assert_eq!(format_percent(-0.001), "-0.00%");
    }

    #[test]
    fn test_format_clock_is_tehran_time() {
        // 22:13:20 UTC
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_clock(at), "01:43:20");
    }

    #[test]
    fn test_ticker_line() {
        let assets = vec![
            asset("usd", "USD", 58_000, 0.5, PriceOrigin::Live),
            asset("eur", "EUR", 62_000, -1.0, PriceOrigin::Live),
        ];
        assert_eq!(ticker_line(&assets), "USD 58,000 +0.50%  |  EUR 62,000 -1.00%");
    }

    #[test]
    fn test_dashboard_badges_and_banner() {
        let mut state = AppState::new(ViewMode::List, None);
        let snapshot = PriceSnapshot::new(
            vec![asset("usd", "USD", 57_500, 0.0, PriceOrigin::Derived)],
            Utc::now(),
            FetchReport::default(),
        );
        state.apply_snapshot(snapshot, 1);
        state.using_cached = true;

        let screen = render_dashboard(&state);
        assert!(screen.contains("[cached 30m]"));
        assert!(screen.contains("[fallback]"));
        assert!(screen.contains("derived from USDT"));
        assert!(screen.contains("brsapi*"));
        assert!(screen.contains("57,500"));
    }

    #[test]
    fn test_empty_dashboard() {
        let screen = render_dashboard(&AppState::default());
        assert!(screen.contains("No prices loaded."));
        assert!(!screen.contains("[fallback]"));
    }

    #[test]
    fn test_cards_wrap_rows() {
        let assets: Vec<_> = (0..5)
            .map(|i| asset(&format!("a{i}"), "SYM", 1_000, 0.0, PriceOrigin::Live))
            .collect();
        let refs: Vec<_> = assets.iter().collect();
        assert_eq!(render_cards(&refs).lines().count(), 10);
    }
}
