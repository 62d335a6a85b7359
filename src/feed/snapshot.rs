use serde::{Deserialize, Deserializer};

use super::FeedError;

/// One decoded response of the 24h borrow/repay statistics endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(deserialize_with = "de_i64")]
    pub calculation_time: i64,
    pub coins: Vec<CoinStat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinStat {
    pub asset: String,
    #[serde(deserialize_with = "de_f64")]
    pub total_borrow_in_usdt: f64,
    #[serde(deserialize_with = "de_f64")]
    pub total_repay_in_usdt: f64,
}

#[derive(Deserialize)]
struct Envelope {
    data: Snapshot,
}

impl Snapshot {
    pub fn parse(body: &str) -> Result<Self, FeedError> {
        let env: Envelope = serde_json::from_str(body)?;
        Ok(env.data)
    }

    /// Asset ids in upstream order.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.coins.iter().map(|c| c.asset.as_str())
    }
}

// Binance serves these figures as numbers on some endpoints and as decimal
// strings on others.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(i64),
    Float(f64),
    Str(String),
}

fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = match NumOrStr::deserialize(d)? {
        NumOrStr::Int(v) => v as f64,
        NumOrStr::Float(v) => v,
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom)?,
    };
    // "NaN" and "inf" parse as f64 but have no JSON form in a stored record.
    if !v.is_finite() {
        return Err(serde::de::Error::custom(format!("non-finite amount {}", v)));
    }
    Ok(v)
}

fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match NumOrStr::deserialize(d)? {
        NumOrStr::Int(v) => Ok(v),
        NumOrStr::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        NumOrStr::Float(v) => Err(serde::de::Error::custom(format!("non-integer time {}", v))),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
