//! Domain primitives: UserId, Symbol, TimeMs, trade kinds and bet enums.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Add a number of whole seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        TimeMs(self.0 + secs * 1000)
    }
}

/// Opaque user identifier. Every core operation takes one explicitly;
/// there is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traded symbol (e.g. "BTC", "ETH").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(sym: impl Into<String>) -> Self {
        Symbol(sym.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a trade record represents.
///
/// Buy/Cover add quantity to a position, Sell/Short subtract.
/// BetUp/BetDown are timed directional bets and never enter aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
    Short,
    Cover,
    BetUp,
    BetDown,
}

impl TradeKind {
    /// True for the timed-bet kinds.
    pub fn is_bet(&self) -> bool {
        matches!(self, TradeKind::BetUp | TradeKind::BetDown)
    }

    /// True if this kind adds quantity to a position.
    pub fn adds_quantity(&self) -> bool {
        matches!(self, TradeKind::Buy | TradeKind::Cover)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::Short => "short",
            TradeKind::Cover => "cover",
            TradeKind::BetUp => "bet_up",
            TradeKind::BetDown => "bet_down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(TradeKind::Buy),
            "sell" => Some(TradeKind::Sell),
            "short" => Some(TradeKind::Short),
            "cover" => Some(TradeKind::Cover),
            "bet_up" => Some(TradeKind::BetUp),
            "bet_down" => Some(TradeKind::BetDown),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order style of a trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStyle {
    Market,
    Limit,
    Timed,
}

impl OrderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStyle::Market => "market",
            OrderStyle::Limit => "limit",
            OrderStyle::Timed => "timed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "market" => Some(OrderStyle::Market),
            "limit" => Some(OrderStyle::Limit),
            "timed" => Some(OrderStyle::Timed),
            _ => None,
        }
    }
}

/// Direction of a timed bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetDirection {
    Up,
    Down,
}

impl BetDirection {
    /// Win rule for timed bets. A tie (close == entry) is a loss for
    /// either direction.
    pub fn is_win(&self, entry: crate::domain::Decimal, close: crate::domain::Decimal) -> bool {
        match self {
            BetDirection::Up => close > entry,
            BetDirection::Down => close < entry,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetDirection::Up => "up",
            BetDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(BetDirection::Up),
            "down" => Some(BetDirection::Down),
            _ => None,
        }
    }

    pub fn kind(&self) -> TradeKind {
        match self {
            BetDirection::Up => TradeKind::BetUp,
            BetDirection::Down => TradeKind::BetDown,
        }
    }
}

/// Final outcome of a timed bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Pending,
    Win,
    Loss,
}

/// Direction of an aggregated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionDirection {
    Long,
    Short,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            TradeKind::Buy,
            TradeKind::Sell,
            TradeKind::Short,
            TradeKind::Cover,
            TradeKind::BetUp,
            TradeKind::BetDown,
        ] {
            assert_eq!(TradeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TradeKind::parse("hold"), None);
    }

    #[test]
    fn test_bet_kinds() {
        assert!(TradeKind::BetUp.is_bet());
        assert!(TradeKind::BetDown.is_bet());
        assert!(!TradeKind::Buy.is_bet());
        assert!(TradeKind::Buy.adds_quantity());
        assert!(TradeKind::Cover.adds_quantity());
        assert!(!TradeKind::Short.adds_quantity());
    }

    #[test]
    fn test_win_rule_up() {
        assert!(BetDirection::Up.is_win(d("100"), d("105")));
        assert!(!BetDirection::Up.is_win(d("100"), d("95")));
    }

    #[test]
    fn test_win_rule_down() {
        assert!(BetDirection::Down.is_win(d("100"), d("95")));
        assert!(!BetDirection::Down.is_win(d("100"), d("105")));
    }

    #[test]
    fn test_tie_is_a_loss_both_ways() {
        assert!(!BetDirection::Up.is_win(d("100"), d("100")));
        assert!(!BetDirection::Down.is_win(d("100"), d("100")));
    }

    #[test]
    fn test_plus_secs() {
        assert_eq!(TimeMs::new(1000).plus_secs(60), TimeMs::new(61_000));
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&TradeKind::BetUp).unwrap(),
            "\"bet_up\""
        );
        assert_eq!(serde_json::to_string(&BetDirection::Up).unwrap(), "\"up\"");
    }
}
