//! Domain records, normalised into a single shape at deserialisation time.
//!
//! The backend is loose about shapes: foreign keys arrive either as a raw id,
//! a numeric string, or a nested object carrying an `id`; decimals arrive as
//! strings or numbers; counters arrive as `null`. The helpers in [`de`]
//! absorb those variations so the calculators never branch on shape.
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub type Id = u64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "de::count")]
    pub total_shares: u64,
    #[serde(default, deserialize_with = "de::amount")]
    pub share_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Foundation,
    Csr,
    Investor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSource {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(default)]
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingType {
    Investor,
    Donation,
}

impl Display for FundingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundingType::Investor => write!(f, "investor"),
            FundingType::Donation => write!(f, "donation"),
        }
    }
}

impl FromStr for FundingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "investor" => Ok(FundingType::Investor),
            "donation" | "donasi" => Ok(FundingType::Donation),
            other => Err(format!("unknown funding type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingStatus {
    Available,
    Allocated,
    Used,
}

impl Display for FundingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundingStatus::Available => write!(f, "available"),
            FundingStatus::Allocated => write!(f, "allocated"),
            FundingStatus::Used => write!(f, "used"),
        }
    }
}

impl FromStr for FundingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(FundingStatus::Available),
            "allocated" => Ok(FundingStatus::Allocated),
            "used" => Ok(FundingStatus::Used),
            other => Err(format!("unknown funding status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub id: Id,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub source: Option<Id>,
    #[serde(default)]
    pub source_name: Option<String>,
    pub source_type: FundingType,
    /// `None` marks pool funding.
    #[serde(default, deserialize_with = "de::opt_id")]
    pub project: Option<Id>,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "de::count")]
    pub shares: u64,
    pub status: FundingStatus,
    #[serde(default)]
    pub date_received: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub proof: Option<String>,
}

impl Funding {
    pub fn is_pool(&self) -> bool {
        self.project.is_none()
    }

    pub fn label(&self) -> String {
        match &self.source_name {
            Some(name) => format!("#{} {}", self.id, name),
            None => format!("#{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investor {
    pub id: Id,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub user: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::amount")]
    pub total_investment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de::amount")]
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub id: Id,
    #[serde(deserialize_with = "de::id")]
    pub investor: Id,
    #[serde(default)]
    pub investor_name: Option<String>,
    /// `None` marks pool capital not yet placed on an asset.
    #[serde(default, deserialize_with = "de::opt_id")]
    pub asset: Option<Id>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub funding: Option<Id>,
    #[serde(default, deserialize_with = "de::count")]
    pub units: u64,
    #[serde(default)]
    pub investment_date: Option<NaiveDate>,
    #[serde(default)]
    pub ownership_percentage: Option<f64>,
    #[serde(default, deserialize_with = "de::amount")]
    pub total_investment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub name: String,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub asset: Option<Id>,
    #[serde(default, deserialize_with = "de::amount")]
    pub budget: Decimal,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExpenseRecord")]
pub struct Expense {
    pub id: Id,
    pub category: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub project_id: Option<Id>,
    pub funding_id: Option<Id>,
    pub description: Option<String>,
}

/// Expense as the backend sends it: references may arrive as `project_id`,
/// as `project`, or as both. The `_id` form wins.
#[derive(Deserialize)]
struct ExpenseRecord {
    id: Id,
    category: String,
    #[serde(default, deserialize_with = "de::amount")]
    amount: Decimal,
    date: NaiveDate,
    #[serde(default, deserialize_with = "de::opt_id")]
    project_id: Option<Id>,
    #[serde(default, deserialize_with = "de::opt_id")]
    project: Option<Id>,
    #[serde(default, deserialize_with = "de::opt_id")]
    funding_id: Option<Id>,
    #[serde(default, deserialize_with = "de::opt_id")]
    funding: Option<Id>,
    #[serde(default)]
    description: Option<String>,
}

impl From<ExpenseRecord> for Expense {
    fn from(record: ExpenseRecord) -> Self {
        Expense {
            id: record.id,
            category: record.category,
            amount: record.amount,
            date: record.date,
            project_id: record.project_id.or(record.project),
            funding_id: record.funding_id.or(record.funding),
            description: record.description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionRole {
    #[serde(alias = "landowner", alias = "LANDOWNER")]
    Landowner,
    #[serde(alias = "investor", alias = "INVESTOR")]
    Investor,
}

impl Display for DistributionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionRole::Landowner => write!(f, "Landowner"),
            DistributionRole::Investor => write!(f, "Investor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionItem {
    pub description: String,
    pub role: DistributionRole,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitDistribution {
    /// Previews are not persisted and carry no id.
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::amount")]
    pub total_distributed: Decimal,
    #[serde(default, deserialize_with = "de::amount")]
    pub landowner_portion: Decimal,
    #[serde(default, deserialize_with = "de::amount")]
    pub investor_portion: Decimal,
    #[serde(default, deserialize_with = "de::amount")]
    pub retained_portion: Decimal,
    #[serde(default, deserialize_with = "de::amount")]
    pub real_distributed: Decimal,
    #[serde(default)]
    pub items: Vec<DistributionItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Account details returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de::id")]
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de::role_name")]
    pub role: Option<String>,
}

pub(crate) mod de {
    use super::Id;
    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    fn value_to_id(value: &Value) -> Option<Id> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Object(map) => map.get("id").and_then(value_to_id),
            _ => None,
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Id, D::Error> {
        let value = Value::deserialize(deserializer)?;
        value_to_id(&value).ok_or_else(|| D::Error::custom(format!("invalid id reference: {value}")))
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Id>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(None),
            Value::String(ref s) if s.trim().is_empty() => Ok(None),
            other => value_to_id(&other)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid id reference: {other}"))),
        }
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .ok_or_else(|| D::Error::custom(format!("invalid count: {value}"))),
            Value::String(s) if s.trim().is_empty() => Ok(0),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid count: {value}"))),
            _ => Err(D::Error::custom(format!("invalid count: {value}"))),
        }
    }

    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(Decimal::ZERO),
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .map_err(|e| D::Error::custom(format!("invalid amount {value}: {e}"))),
            Value::String(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
            Value::String(s) => Decimal::from_str(s.trim())
                .map_err(|e| D::Error::custom(format!("invalid amount {value}: {e}"))),
            _ => Err(D::Error::custom(format!("invalid amount: {value}"))),
        }
    }

    /// Roles come back as a plain name or as `{"id": .., "name": ..}`.
    pub fn role_name<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Some(s),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
    }
}
