use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One fund page to scrape, as listed in the local sources file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSource {
    pub name: String,
    pub url: String,
    #[serde(rename = "dividenPercentage", default)]
    pub dividend_percentage: f64,
}

/// Holdings used to size the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub num: f64,
    pub net_worth: f64,
}

impl UserData {
    pub fn fund_total(&self) -> f64 {
        self.num * self.net_worth
    }
}

/// Daily dividend figure for one fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub code: String,
    pub name: String,
    #[serde(rename = "dividen")]
    pub dividend: f64,
    pub date: String,
}

/// Fund target served by the portal at `fundTargets/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundTarget {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fund_source_defaults_percentage() {
        let json = r#"{"name": "Global Bond", "url": "https://example.com/a"}"#;
        let source: FundSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.dividend_percentage, 0.0);

        let json = r#"{"name": "Global Bond", "url": "https://example.com/a", "dividenPercentage": 0.05}"#;
        let source: FundSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.dividend_percentage, 0.05);
    }

    #[test]
    fn test_fund_total() {
        let user = UserData { num: 1000.0, net_worth: 10.5 };
        assert_eq!(user.fund_total(), 10_500.0);
    }

    #[test]
    fn test_record_field_names() {
        let record = FundRecord {
            code: "ABU033".to_string(),
            name: "Fund".to_string(),
            dividend: 1.5,
            date: "2024-01-02".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["dividen"], 1.5);
        assert_eq!(value["date"], "2024-01-02");
    }

    #[test]
    fn test_fund_target_keeps_extra_fields() {
        let json = r#"{"code": "ABU033", "url": "https://example.com/a", "currency": "USD"}"#;
        let target: FundTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.code, "ABU033");
        assert_eq!(target.name, None);
        assert_eq!(target.extra["currency"], "USD");
    }
}
