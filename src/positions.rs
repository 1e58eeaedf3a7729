//! Position snapshots and the grid columns the CLI shows them with.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_grid::{DataGridConfig, DataGridConfigMap, DataGridEngine, DataGridFactory, HeaderCell};
use crate::error::{GridError, GridResult};
use crate::sort_filter::{ColumnKey, SortFilterOptions, SortOrder, SortedBy, SyncOptions};
use crate::time::{some_time_ago_ms, ZonedFormatter};
use crate::utils::split_list;

/// One row of a position export; `ts` is epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ts: f64,
    pub market_id: String,
    #[serde(default)]
    pub event_id: String,
    pub position: f64,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub mark_price: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
    Flat,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Long, Side::Short, Side::Flat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
            Side::Flat => "flat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Side::ALL.into_iter().find(|side| side.as_str() == s.trim().to_lowercase())
    }
}

impl PositionSnapshot {
    pub fn side(&self) -> Side {
        if self.position > 0.0 {
            Side::Long
        } else if self.position < 0.0 {
            Side::Short
        } else {
            Side::Flat
        }
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        if !self.ts.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((self.ts * 1000.0).round() as i64)
    }

    pub fn total_pnl(&self) -> f64 {
        self.unrealized_pnl + self.realized_pnl
    }
}

/// Reads a JSON array of snapshots.
pub fn load_positions(path: &Path) -> GridResult<Vec<PositionSnapshot>> {
    let json = std::fs::read_to_string(path)?;
    let rows: Vec<PositionSnapshot> = serde_json::from_str(&json)?;
    log::debug!("positions.load path={} rows={}", path.display(), rows.len());
    Ok(rows)
}

/// Latest snapshot per market, newest first.
pub fn latest_per_market(rows: Vec<PositionSnapshot>) -> Vec<PositionSnapshot> {
    let mut latest: Vec<PositionSnapshot> = Vec::new();
    for row in rows {
        match latest.iter_mut().find(|r| r.market_id == row.market_id) {
            Some(existing) if row.ts >= existing.ts => *existing = row,
            Some(_) => {}
            None => latest.push(row),
        }
    }
    latest.sort_by(|a, b| b.ts.total_cmp(&a.ts));
    latest
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionColumn {
    Market,
    Event,
    Side,
    Position,
    Mark,
    Pnl,
    Updated,
}

impl PositionColumn {
    pub const ALL: [PositionColumn; 7] = [
        PositionColumn::Market,
        PositionColumn::Event,
        PositionColumn::Side,
        PositionColumn::Position,
        PositionColumn::Mark,
        PositionColumn::Pnl,
        PositionColumn::Updated,
    ];
}

impl ColumnKey for PositionColumn {
    fn as_str(&self) -> &'static str {
        match self {
            PositionColumn::Market => "market",
            PositionColumn::Event => "event",
            PositionColumn::Side => "side",
            PositionColumn::Position => "position",
            PositionColumn::Mark => "mark",
            PositionColumn::Pnl => "pnl",
            PositionColumn::Updated => "updated",
        }
    }
}

impl FromStr for PositionColumn {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PositionColumn::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GridError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for PositionColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `key:asc|desc`.
pub fn parse_sort_spec(spec: &str) -> GridResult<(PositionColumn, SortOrder)> {
    let (key, order) = spec
        .split_once(':')
        .ok_or_else(|| GridError::MalformedSpec(spec.to_string()))?;
    Ok((key.parse()?, order.trim().parse()?))
}

/// Parses `key=v1,v2`.
pub fn parse_filter_spec(spec: &str) -> GridResult<(PositionColumn, Vec<String>)> {
    let (key, values) = spec
        .split_once('=')
        .filter(|(_, v)| !v.is_empty())
        .ok_or_else(|| GridError::MalformedSpec(spec.to_string()))?;
    Ok((key.parse()?, split_list(values)))
}

pub fn fmt_num(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{:.*}", decimals, v)
    } else {
        "--".to_string()
    }
}

pub fn fmt_usd(v: f64) -> String {
    if !v.is_finite() {
        return "--".to_string();
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{}${:.2}", sign, v.abs())
}

fn lowercase_values(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()).collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.is_empty() || needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn distinct<I: IntoIterator<Item = String>>(values: I) -> Vec<Option<String>> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out.into_iter().map(Some).collect()
}

pub type PositionGridFactory = DataGridFactory<PositionColumn, PositionSnapshot, String>;
pub type PositionGrid = DataGridEngine<PositionColumn, PositionSnapshot, String>;
type PositionConfig = DataGridConfig<PositionColumn, PositionSnapshot, String>;

/// Column set for position rows; timestamps render through `formatter`.
pub fn position_columns(formatter: Arc<ZonedFormatter>) -> DataGridConfigMap<PositionColumn, PositionSnapshot, String> {
    let updated_text = {
        let formatter = formatter.clone();
        move |p: &PositionSnapshot| match p.updated_at() {
            Some(at) => {
                let (date, time) = formatter.to_date_and_time(&at, true);
                format!("{} {}", date, time)
            }
            None => "--".to_string(),
        }
    };
    let zone_label = format!("Updated ({})", formatter.zone_name());

    DataGridConfigMap::new()
        .with(
            PositionColumn::Market,
            PositionConfig::new(|p| p.market_id.clone())
                .label("Market")
                .sort(|p: &PositionSnapshot| p.market_id.clone())
                .filter(|values| {
                    let needles = lowercase_values(values);
                    move |p: &PositionSnapshot| contains_any(&p.market_id, &needles)
                })
                .options(|rows: &[PositionSnapshot]| distinct(rows.iter().map(|p| p.market_id.clone()))),
        )
        .with(
            PositionColumn::Event,
            PositionConfig::new(|p| p.event_id.clone())
                .label("Event")
                .sort(|p: &PositionSnapshot| p.event_id.clone())
                .filter(|values| {
                    let needles = lowercase_values(values);
                    move |p: &PositionSnapshot| contains_any(&p.event_id, &needles)
                })
                .options(|rows: &[PositionSnapshot]| distinct(rows.iter().map(|p| p.event_id.clone()))),
        )
        .with(
            PositionColumn::Side,
            PositionConfig::new(|p| p.side().as_str().to_string())
                .label("Side")
                .sort(|p: &PositionSnapshot| p.side().as_str())
                .filter(|values| {
                    let sides: Vec<Side> = values.iter().filter_map(|v| Side::parse(v)).collect();
                    move |p: &PositionSnapshot| sides.contains(&p.side())
                })
                .options(|rows: &[PositionSnapshot]| {
                    Side::ALL
                        .into_iter()
                        .filter(|s| rows.iter().any(|p| p.side() == *s))
                        .map(|s| Some(s.as_str().to_string()))
                        .collect()
                }),
        )
        .with(
            PositionColumn::Position,
            PositionConfig::new(|p| fmt_num(p.position, 2))
                .label("Position")
                .sort(|p: &PositionSnapshot| p.position),
        )
        .with(
            PositionColumn::Mark,
            PositionConfig::new(|p| fmt_num(p.mark_price, 3))
                .label("Mark")
                .sort(|p: &PositionSnapshot| p.mark_price),
        )
        .with(
            PositionColumn::Pnl,
            PositionConfig::new(|p| fmt_usd(p.unrealized_pnl))
                .label("uPnL")
                .sort(|p: &PositionSnapshot| p.unrealized_pnl)
                .filter(|values| {
                    let wanted = lowercase_values(values);
                    let gain = wanted.iter().any(|v| v == "gain");
                    let loss = wanted.iter().any(|v| v == "loss");
                    move |p: &PositionSnapshot| {
                        (gain && p.unrealized_pnl > 0.0) || (loss && p.unrealized_pnl < 0.0)
                    }
                })
                .options(|_| vec![Some("gain".to_string()), Some("loss".to_string())])
                .value_as(|_, p, _| {
                    let arrow = if p.unrealized_pnl > 0.0 {
                        "▲"
                    } else if p.unrealized_pnl < 0.0 {
                        "▼"
                    } else {
                        return None;
                    };
                    Some(format!("{} {}", fmt_usd(p.unrealized_pnl), arrow))
                }),
        )
        .with(
            PositionColumn::Updated,
            PositionConfig::new(updated_text)
                .sort(|p: &PositionSnapshot| p.ts)
                // Value is a duration such as `15m`: rows updated within it.
                .filter(|values| {
                    let window = values.first().cloned().unwrap_or_default();
                    let cutoff_ms = match some_time_ago_ms(window.as_str()) {
                        Ok(ms) => Some(ms as f64),
                        Err(e) => {
                            log::warn!("positions.updated_filter_ignored value={} err={}", window, e);
                            None
                        }
                    };
                    move |p: &PositionSnapshot| cutoff_ms.map_or(true, |cutoff| p.ts * 1000.0 >= cutoff)
                })
                .render_string_value(|v| format!("last {}", v))
                .th(move |_, _| HeaderCell::Label(zone_label.clone())),
        )
}

#[derive(Debug, Clone, Default)]
pub struct PositionGridOptions {
    pub default_sort: Option<(PositionColumn, SortOrder)>,
    pub sync: Option<SyncOptions>,
}

pub fn position_grid_factory(formatter: ZonedFormatter, options: PositionGridOptions) -> GridResult<PositionGridFactory> {
    let columns = position_columns(Arc::new(formatter));
    let map = columns.sort_filter_map();
    let default_sort = options
        .default_sort
        .map(|(key, order)| SortedBy::new(&map, key, order))
        .transpose()?;
    Ok(DataGridFactory::new(
        columns,
        SortFilterOptions {
            default_filters: Vec::new(),
            default_sort,
            sync: options.sync,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_grid::Cell;
    use crate::sort_filter::SortFilterAction;
    use crate::sync::SyncEnv;

    fn snap(ts: f64, market: &str, position: f64, upnl: f64) -> PositionSnapshot {
        PositionSnapshot {
            ts,
            market_id: market.to_string(),
            event_id: format!("evt-{}", market),
            position,
            avg_price: 0.5,
            mark_price: 0.55,
            unrealized_pnl: upnl,
            realized_pnl: 0.0,
        }
    }

    fn grid() -> PositionGrid {
        let rows = vec![
            snap(1_700_000_000.0, "BTC-100K", 10.0, 4.5),
            snap(1_700_000_060.0, "ETH-5K", -3.0, -1.25),
            snap(1_700_000_120.0, "FED-CUT", 0.0, 0.0),
        ];
        position_grid_factory(ZonedFormatter::utc(), PositionGridOptions::default())
            .unwrap()
            .mount(rows, &SyncEnv::default())
    }

    fn markets(grid: &PositionGrid) -> Vec<String> {
        grid.sort_filter().iter_view().map(|p| p.market_id.clone()).collect()
    }

    #[test]
    fn column_names_round_trip() {
        for column in PositionColumn::ALL {
            assert_eq!(column.as_str().parse::<PositionColumn>().unwrap(), column);
        }
        assert!("price".parse::<PositionColumn>().is_err());
    }

    #[test]
    fn parses_cli_specs() {
        assert_eq!(parse_sort_spec("pnl:desc").unwrap(), (PositionColumn::Pnl, SortOrder::Desc));
        assert!(matches!(parse_sort_spec("pnl"), Err(GridError::MalformedSpec(_))));
        assert!(matches!(parse_sort_spec("pnl:up"), Err(GridError::InvalidSortOrder(_))));
        assert_eq!(
            parse_filter_spec("side=long,short").unwrap(),
            (PositionColumn::Side, vec!["long".to_string(), "short".to_string()])
        );
        assert!(matches!(parse_filter_spec("side="), Err(GridError::MalformedSpec(_))));
        assert!(matches!(parse_filter_spec("colour=red"), Err(GridError::UnknownKey(_))));
    }

    #[test]
    fn side_and_pnl_filters() {
        let mut grid = grid();
        grid.dispatch(SortFilterAction::FilterBy {
            key: PositionColumn::Side,
            value: vec!["short".to_string(), "flat".to_string()],
        })
        .unwrap();
        assert_eq!(markets(&grid), vec!["ETH-5K", "FED-CUT"]);

        grid.dispatch(SortFilterAction::FilterBy {
            key: PositionColumn::Pnl,
            value: vec!["loss".to_string()],
        })
        .unwrap();
        assert_eq!(markets(&grid), vec!["ETH-5K"]);
    }

    #[test]
    fn market_filter_is_case_insensitive_substring() {
        let mut grid = grid();
        grid.dispatch(SortFilterAction::FilterBy {
            key: PositionColumn::Market,
            value: vec!["eth".to_string(), "cut".to_string()],
        })
        .unwrap();
        assert_eq!(markets(&grid), vec!["ETH-5K", "FED-CUT"]);
    }

    #[test]
    fn invalid_updated_window_keeps_every_row() {
        let mut grid = grid();
        grid.dispatch(SortFilterAction::FilterBy {
            key: PositionColumn::Updated,
            value: vec!["soon".to_string()],
        })
        .unwrap();
        assert_eq!(grid.sort_filter().view_indices().len(), 3);

        // The fixtures are from 2023, far outside a one-hour window.
        grid.dispatch(SortFilterAction::FilterBy {
            key: PositionColumn::Updated,
            value: vec!["1h".to_string()],
        })
        .unwrap();
        assert!(grid.sort_filter().view_indices().is_empty());
    }

    #[test]
    fn sorts_by_pnl_and_renders_cells() {
        let mut grid = grid();
        grid.dispatch(SortFilterAction::SortBy {
            key: PositionColumn::Pnl,
            order: SortOrder::Desc,
        })
        .unwrap();
        let rendered = grid.render().unwrap();
        assert_eq!(rendered.columns[5], "pnl");
        assert_eq!(rendered.headers[5], HeaderCell::Label("uPnL".to_string()));
        assert_eq!(rendered.headers[6], HeaderCell::Label("Updated (UTC)".to_string()));

        let first = &rendered.rows[0];
        assert_eq!(first[0], Cell::Text("BTC-100K".to_string()));
        assert_eq!(first[2], Cell::Text("long".to_string()));
        assert_eq!(first[3], Cell::Text("10.00".to_string()));
        assert_eq!(first[5], Cell::Custom("$4.50 ▲".to_string()));
        assert_eq!(first[6], Cell::Text("2023-11-14 22:13:20".to_string()));
        assert_eq!(rendered.rows[1][5], Cell::Text("$0.00".to_string()));
        assert_eq!(rendered.rows[2][5], Cell::Custom("-$1.25 ▼".to_string()));
    }

    #[test]
    fn updated_renders_in_zone() {
        let grid = position_grid_factory(
            ZonedFormatter::new("America/New_York").unwrap(),
            PositionGridOptions::default(),
        )
        .unwrap()
        .mount(vec![snap(1_700_000_000.0, "BTC-100K", 1.0, 0.0)], &SyncEnv::default());
        let row = &grid.sort_filter().unfiltered_data()[0];
        assert_eq!(
            grid.render_cell(PositionColumn::Updated, row).unwrap(),
            Cell::Text("2023-11-14 17:13:20".to_string())
        );
    }

    #[test]
    fn options_list_present_values() {
        let grid = grid();
        let sf = grid.sort_filter();
        assert_eq!(sf.options_for(&PositionColumn::Side).unwrap(), vec!["long", "short", "flat"]);
        assert_eq!(sf.options_for(&PositionColumn::Market).unwrap().len(), 3);
        assert!(sf.options_for(&PositionColumn::Mark).unwrap().is_empty());
    }

    #[test]
    fn latest_snapshot_wins_per_market() {
        let rows = vec![
            snap(10.0, "A", 1.0, 0.0),
            snap(30.0, "B", 2.0, 0.0),
            snap(20.0, "A", 3.0, 0.0),
            snap(5.0, "A", 9.0, 0.0),
        ];
        let latest = latest_per_market(rows);
        assert_eq!(latest.len(), 2);
        assert_eq!((latest[0].market_id.as_str(), latest[0].position), ("B", 2.0));
        assert_eq!((latest[1].market_id.as_str(), latest[1].position), ("A", 3.0));
    }

    #[test]
    fn loads_exported_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");
        std::fs::write(
            &path,
            r#"[{"ts": 1700000000.0, "market_id": "BTC-100K", "position": 2.0, "mark_price": 0.61}]"#,
        )
        .unwrap();
        let rows = load_positions(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_id, "");
        assert_eq!(rows[0].side(), Side::Long);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_positions(&path), Err(GridError::Json(_))));
        assert!(matches!(load_positions(&dir.path().join("missing.json")), Err(GridError::Io(_))));
    }
}
