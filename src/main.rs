use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;

use gridstate::{
    config::Settings,
    data_grid::{Cell, HeaderCell, RenderedGrid},
    positions::{
        latest_per_market, load_positions, parse_filter_spec, parse_sort_spec, position_grid_factory, PositionColumn,
        PositionGrid, PositionGridOptions,
    },
    sort_filter::{ColumnKey, SortFilterAction},
    sync::{shared_cookie_jar, shared_search_params, CookieJar, SyncEnv},
};

#[derive(Debug, Parser)]
#[command(name = "gridstate", version)]
struct Cli {
    /// Position export (JSON array); overrides GRID_POSITIONS_PATH
    #[arg(long)]
    positions: Option<String>,

    /// Page query string the grid reads its state from and writes it back to
    #[arg(long, default_value = "")]
    query: String,

    /// Filter a column, e.g. --filter side=long,short (repeatable)
    #[arg(long = "filter", value_name = "KEY=V1,V2")]
    filters: Vec<String>,

    /// Drop one column's filter (repeatable)
    #[arg(long = "clear-filter", value_name = "KEY")]
    clear_filters: Vec<String>,

    /// Sort, e.g. --sort pnl:desc
    #[arg(long, value_name = "KEY:asc|desc")]
    sort: Option<String>,

    /// Header-click sort: ascending first, flips on the current column
    #[arg(long = "toggle-sort", value_name = "KEY")]
    toggle_sort: Option<String>,

    #[arg(long)]
    clear_sort: bool,

    /// Clear every filter and the sort before applying the other flags
    #[arg(long)]
    reset: bool,

    /// List filter candidates for a column and exit
    #[arg(long, value_name = "KEY")]
    options: Option<String>,

    /// Show every snapshot instead of the latest one per market
    #[arg(long)]
    all_snapshots: bool,
}

impl Cli {
    /// Flag actions in application order: reset, filter clears, filters, sort
    /// clear, sort, toggle.
    fn actions(&self) -> Result<Vec<SortFilterAction<PositionColumn>>> {
        let mut actions = Vec::new();
        if self.reset {
            actions.push(SortFilterAction::Reset);
        }
        for key in &self.clear_filters {
            actions.push(SortFilterAction::ClearFilter(Some(key.parse()?)));
        }
        for spec in &self.filters {
            let (key, value) = parse_filter_spec(spec).with_context(|| format!("--filter {spec}"))?;
            actions.push(SortFilterAction::FilterBy { key, value });
        }
        if self.clear_sort {
            actions.push(SortFilterAction::ClearSort);
        }
        if let Some(spec) = &self.sort {
            let (key, order) = parse_sort_spec(spec).with_context(|| format!("--sort {spec}"))?;
            actions.push(SortFilterAction::SortBy { key, order });
        }
        if let Some(key) = &self.toggle_sort {
            actions.push(SortFilterAction::ToggleSort(key.parse()?));
        }
        Ok(actions)
    }
}

fn header_text(header: &HeaderCell<String>) -> &str {
    match header {
        HeaderCell::Label(s) | HeaderCell::Custom(s) => s,
    }
}

fn cell_text(cell: &Cell<String>) -> &str {
    match cell {
        Cell::Text(s) | Cell::Custom(s) => s,
    }
}

fn print_grid(rendered: &RenderedGrid<String>, row_limit: usize) {
    let shown = if row_limit == 0 {
        rendered.rows.len()
    } else {
        rendered.rows.len().min(row_limit)
    };
    let mut widths: Vec<usize> = rendered
        .headers
        .iter()
        .map(|h| header_text(h).chars().count())
        .collect();
    for row in &rendered.rows[..shown] {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell_text(cell).chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(rendered.headers.iter().map(header_text).collect()));
    println!("{}", line(widths.iter().map(|_| "").collect()).replace(' ', "-"));
    for row in &rendered.rows[..shown] {
        println!("{}", line(row.iter().map(cell_text).collect()));
    }
    if shown < rendered.rows.len() {
        println!("... {} more rows", rendered.rows.len() - shown);
    }
}

fn print_state(grid: &PositionGrid) {
    let sf = grid.sort_filter();
    let filters: Vec<String> = sf
        .filtered_by()
        .iter()
        .map(|f| {
            let shown: Vec<String> = f.value.iter().map(|v| f.config.render_string(v)).collect();
            format!("{}={}", f.key.as_str(), shown.join(","))
        })
        .collect();
    let sort = sf
        .sorted_by()
        .map(|s| format!("{}:{}", s.key.as_str(), s.order))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "rows {}/{}  filters [{}]  sort {}",
        sf.view_indices().len(),
        sf.unfiltered_data().len(),
        filters.join(" "),
        sort
    );
}

fn save_cookie_jar(settings: &Settings, env: &SyncEnv, now: DateTime<Utc>) -> Result<()> {
    if settings.cookie_name.is_none() {
        return Ok(());
    }
    let jar_path = Path::new(&settings.cookie_jar_path);
    let mut jar = env.cookies.write();
    jar.purge_expired(now);
    jar.save(jar_path)
        .with_context(|| format!("failed to save cookie jar to {}", jar_path.display()))?;
    log::info!("grid.cookie_jar_saved path={} cookies={}", jar_path.display(), jar.len());
    Ok(())
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let formatter = settings.formatter()?;

    let jar = match settings.cookie_name {
        Some(_) => CookieJar::load(Path::new(&settings.cookie_jar_path)),
        None => CookieJar::new(),
    };
    let env = SyncEnv::new(shared_cookie_jar(jar), shared_search_params(&cli.query));

    let mut rows = load_positions(Path::new(&settings.positions_path))
        .with_context(|| format!("failed to load positions from {}", settings.positions_path))?;
    if settings.latest_only && !cli.all_snapshots {
        rows = latest_per_market(rows);
    }

    log::info!(
        "grid.start positions={} rows={} zone={} cookie={} search_params={}",
        settings.positions_path,
        rows.len(),
        formatter.zone_name(),
        settings.cookie_name.as_deref().unwrap_or("off"),
        settings.sync_search_params
    );

    let factory = position_grid_factory(
        formatter.clone(),
        PositionGridOptions {
            default_sort: settings.default_sort()?,
            sync: Some(settings.sync_options()),
        },
    )?;
    let mut grid = factory.mount(rows, &env);

    if let Some(key) = &cli.options {
        let key: PositionColumn = key.parse()?;
        for option in grid.sort_filter().options_for(&key)? {
            println!("{option}");
        }
        // Mount refreshed the cookie expiry.
        return save_cookie_jar(settings, &env, Utc::now());
    }

    for action in cli.actions()? {
        log::debug!("grid.action {:?}", action);
        grid.dispatch(action)?;
    }

    let mut rendered = grid.render()?;
    if rendered.applied > 0 {
        rendered = grid.render()?;
    }
    print_grid(&rendered, settings.row_limit);
    print_state(&grid);

    let now = Utc::now();
    let (date, time) = formatter.to_date_and_time(&now, true);
    println!(
        "zone {} ({}){}  now {} {}",
        formatter.zone_name(),
        formatter.utc_offset_at(&now),
        if formatter.is_zone_aware() { "" } else { " [utc fallback]" },
        date,
        time
    );
    println!("query ?{}", env.search_params.read());

    save_cookie_jar(settings, &env, now)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(p) = &cli.positions {
        settings.positions_path = p.clone();
    }
    run(&cli, &settings)
}
