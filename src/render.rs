//! Dashboard page: one ECharts line chart per tracked asset.

use chrono::{Local, TimeZone};
use serde_json::{json, Value};

use crate::logging::{log_asset_failed, Domain};
use crate::store::{AssetSeries, SeriesStore};

pub const TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const ECHARTS_JS: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";

/// Two aligned series against a shared, already formatted time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_axis: Vec<String>,
    pub borrowed: Vec<f64>,
    pub repaid: Vec<f64>,
}

impl LineChart {
    pub fn from_series_in<Tz: TimeZone>(asset: &str, series: &AssetSeries, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            title: asset.to_string(),
            x_axis: series.time().iter().map(|ts| format_ts(*ts, tz)).collect(),
            borrowed: series.borrow().to_vec(),
            repaid: series.repay().to_vec(),
        }
    }

    pub fn from_series(asset: &str, series: &AssetSeries) -> Self {
        Self::from_series_in(asset, series, &Local)
    }

    /// ECharts option object for this chart.
    pub fn options(&self) -> Value {
        let line = |name: &str, data: &[f64]| {
            json!({
                "name": name,
                "type": "line",
                "data": data,
                "smooth": true,
                "showSymbol": true,
                "symbol": "circle",
                "symbolSize": 10,
                "label": { "show": true },
            })
        };
        json!({
            "title": { "text": self.title },
            "tooltip": { "show": true },
            "legend": { "show": true },
            "xAxis": [{ "type": "category", "data": self.x_axis }],
            "yAxis": [{ "type": "value", "scale": true }],
            "dataZoom": [{ "type": "slider", "start": 0, "end": 100, "xAxisIndex": [0] }],
            "series": [line("Borrowed", &self.borrowed), line("Repaid", &self.repaid)],
        })
    }
}

fn format_ts<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => ts.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub charts: Vec<LineChart>,
}

impl Page {
    pub fn to_html(&self) -> String {
        let mut body = String::new();
        for (i, chart) in self.charts.iter().enumerate() {
            // Keep "</script>" inside string values from closing the element.
            let opts = chart.options().to_string().replace("</", "<\\/");
            body.push_str(&format!(
                r#"<div class="container"><div class="item" id="chart-{i}" style="width:900px;height:500px;"></div></div>
<script type="text/javascript">
  echarts.init(document.getElementById('chart-{i}'), "white").setOption({opts});
</script>
"#
            ));
        }
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Margin borrow / repay</title>
<script src="{ECHARTS_JS}"></script>
<style>
  .container {{ display: flex; justify-content: center; align-items: center; }}
  .item {{ margin: auto; }}
</style>
</head>
<body>
{body}</body>
</html>
"#
        )
    }
}

pub struct DashboardRenderer {
    store: SeriesStore,
}

impl DashboardRenderer {
    pub fn new(store: SeriesStore) -> Self {
        Self { store }
    }

    /// One chart per asset in the given order. Assets whose record cannot be
    /// read are logged and left out.
    pub fn render(&self, assets: &[String]) -> Page {
        let charts = assets
            .iter()
            .filter_map(|asset| match self.store.load(asset) {
                Ok(series) => Some(LineChart::from_series(asset, &series)),
                Err(e) => {
                    log_asset_failed(Domain::Render, asset, &e.to_string());
                    None
                }
            })
            .collect();
        Page { charts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn axis_uses_day_first_format() {
        let s = AssetSeries::from_parts(vec![5.0, 7.0], vec![3.0, 4.0], vec![0, 1_700_000_000]).unwrap();
        let chart = LineChart::from_series_in("BTC", &s, &Utc);
        assert_eq!(chart.x_axis, vec!["01-01-1970 00:00:00", "14-11-2023 22:13:20"]);
        assert_eq!(chart.borrowed, vec![5.0, 7.0]);
        assert_eq!(chart.repaid, vec![3.0, 4.0]);
    }

    #[test]
    fn empty_series_gives_empty_axes() {
        let chart = LineChart::from_series_in("ETH", &AssetSeries::new(), &Utc);
        assert!(chart.x_axis.is_empty());
        let opts = chart.options();
        assert_eq!(opts["xAxis"][0]["data"], json!([]));
        assert_eq!(opts["series"][0]["data"], json!([]));
        assert_eq!(opts["series"][1]["data"], json!([]));
    }

    #[test]
    fn options_carry_names_and_zoom() {
        let s = AssetSeries::from_parts(vec![1.0], vec![2.0], vec![0]).unwrap();
        let opts = LineChart::from_series_in("BTC", &s, &Utc).options();
        assert_eq!(opts["title"]["text"], "BTC");
        assert_eq!(opts["series"][0]["name"], "Borrowed");
        assert_eq!(opts["series"][1]["name"], "Repaid");
        assert_eq!(opts["dataZoom"][0]["start"], 0);
        assert_eq!(opts["dataZoom"][0]["end"], 100);
        assert_eq!(opts["yAxis"][0]["scale"], true);
    }

    #[test]
    fn html_has_one_container_per_chart_and_escapes_script_end() {
        let page = Page {
            charts: vec![
                LineChart::from_series_in("BTC", &AssetSeries::new(), &Utc),
                LineChart::from_series_in("</script>", &AssetSeries::new(), &Utc),
            ],
        };
        let html = page.to_html();
        assert!(html.contains("id=\"chart-0\""));
        assert!(html.contains("id=\"chart-1\""));
        assert!(!html.contains("\"</script>\""));
        assert!(html.contains("<\\/script>"));
    }
}
