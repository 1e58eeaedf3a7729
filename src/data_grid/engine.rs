use std::cell::RefCell;
use std::sync::Arc;

use super::{Cell, DataGridConfigMap, GridContext, HeaderCell, RenderedGrid};
use crate::error::GridResult;
use crate::sort_filter::{ColumnKey, SortFilterAction, SortFilterEngine, SortFilterFactory, SortFilterOptions};
use crate::sync::SyncEnv;

pub struct DataGridFactory<K, T, R> {
    columns: Arc<DataGridConfigMap<K, T, R>>,
    sort_filter: SortFilterFactory<K, T>,
}

impl<K: ColumnKey, T, R> DataGridFactory<K, T, R> {
    /// `options` must be built against `columns.sort_filter_map()`.
    pub fn new(columns: DataGridConfigMap<K, T, R>, options: SortFilterOptions<K, T>) -> Self {
        let sort_filter = SortFilterFactory::new(columns.sort_filter_map(), options);
        Self {
            columns: Arc::new(columns),
            sort_filter,
        }
    }

    pub fn columns(&self) -> &Arc<DataGridConfigMap<K, T, R>> {
        &self.columns
    }

    pub fn sort_filter(&self) -> &SortFilterFactory<K, T> {
        &self.sort_filter
    }

    pub fn mount(&self, data: Vec<T>, env: &SyncEnv) -> DataGridEngine<K, T, R> {
        DataGridEngine {
            columns: self.columns.clone(),
            sort_filter: self.sort_filter.mount(data, env),
            pending: RefCell::new(Vec::new()),
        }
    }
}

pub struct DataGridEngine<K, T, R> {
    columns: Arc<DataGridConfigMap<K, T, R>>,
    sort_filter: SortFilterEngine<K, T>,
    pending: RefCell<Vec<SortFilterAction<K>>>,
}

impl<K: ColumnKey, T, R> DataGridEngine<K, T, R> {
    pub fn columns(&self) -> &Arc<DataGridConfigMap<K, T, R>> {
        &self.columns
    }

    pub fn sort_filter(&self) -> &SortFilterEngine<K, T> {
        &self.sort_filter
    }

    pub fn sort_filter_mut(&mut self) -> &mut SortFilterEngine<K, T> {
        &mut self.sort_filter
    }

    pub fn dispatch(&mut self, action: SortFilterAction<K>) -> GridResult<()> {
        self.sort_filter.dispatch(action)
    }

    pub fn set_data(&mut self, data: Vec<T>) {
        self.sort_filter.set_data(data);
    }

    fn context(&self) -> GridContext<'_, K, T, R> {
        GridContext::new(&self.sort_filter, &self.columns, &self.pending)
    }

    pub fn render_header(&self, key: K) -> GridResult<HeaderCell<R>> {
        let config = self.columns.config(&key)?;
        Ok(match config.header_renderer() {
            Some(render) => render(key, &self.context()),
            None => HeaderCell::Label(
                config
                    .sort_filter()
                    .label_text()
                    .unwrap_or(key.as_str())
                    .to_string(),
            ),
        })
    }

    pub fn render_cell(&self, key: K, row: &T) -> GridResult<Cell<R>> {
        let config = self.columns.config(&key)?;
        let custom = config
            .cell_renderer()
            .and_then(|render| render(key, row, &self.context()));
        Ok(match custom {
            Some(node) => Cell::Custom(node),
            None => Cell::Text(config.value_as_string(row)),
        })
    }

    /// Renders every header and every visible row, then applies the actions
    /// renderers queued during the pass.
    pub fn render(&mut self) -> GridResult<RenderedGrid<R>> {
        let keys: Vec<K> = self.columns.keys().collect();
        let headers = keys
            .iter()
            .map(|&key| self.render_header(key))
            .collect::<GridResult<Vec<_>>>()?;
        let rows = self
            .sort_filter
            .iter_view()
            .map(|row| {
                keys.iter()
                    .map(|&key| self.render_cell(key, row))
                    .collect::<GridResult<Vec<_>>>()
            })
            .collect::<GridResult<Vec<_>>>()?;
        let applied = self.apply_pending();
        Ok(RenderedGrid {
            columns: keys.iter().map(|k| k.as_str().to_string()).collect(),
            headers,
            rows,
            applied,
        })
    }

    /// Applies queued renderer actions in order; failures are logged and skipped.
    pub fn apply_pending(&mut self) -> usize {
        let actions = std::mem::take(self.pending.get_mut());
        let mut applied = 0;
        for action in actions {
            match self.sort_filter.dispatch(action.clone()) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("grid.action_failed action={:?} err={}", action, e),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_grid::DataGridConfig;
    use crate::sort_filter::{SortOrder, SortedBy};

    #[derive(Debug, Clone)]
    struct Product {
        title: String,
        category: String,
    }

    fn products() -> Vec<Product> {
        [("Boots", "shoes"), ("Scarf", "accessories"), ("Belt", "accessories")]
            .into_iter()
            .map(|(t, c)| Product {
                title: t.to_string(),
                category: c.to_string(),
            })
            .collect()
    }

    /// Markup-ish render output for custom cells.
    type Node = String;

    fn columns() -> DataGridConfigMap<&'static str, Product, Node> {
        DataGridConfigMap::new()
            .with(
                "title",
                DataGridConfig::new(|p: &Product| p.title.clone()).sort(|p: &Product| p.title.clone()),
            )
            .with(
                "category",
                DataGridConfig::new(|p: &Product| p.category.clone())
                    .label("Category")
                    .sort(|p: &Product| p.category.clone())
                    .filter(|v| {
                        let needle = v.first().cloned().unwrap_or_default().to_lowercase();
                        move |p: &Product| p.category.to_lowercase().contains(&needle)
                    })
                    .th(|key, ctx| {
                        let marker = match ctx.sorted_by() {
                            Some(s) if s.key == key => s.order.as_str(),
                            _ => "-",
                        };
                        HeaderCell::Custom(format!("<th>Category {}</th>", marker))
                    })
                    .value_as(|key, row, ctx| {
                        let text = ctx.value_as_string(key, row).ok()?;
                        Some(format!("<td><= {} =></td>", text))
                    }),
            )
    }

    fn grid() -> DataGridEngine<&'static str, Product, Node> {
        DataGridFactory::new(columns(), SortFilterOptions::default()).mount(products(), &SyncEnv::default())
    }

    #[test]
    fn headers_default_to_label_or_key() {
        let grid = grid();
        assert_eq!(grid.render_header("title").unwrap(), HeaderCell::Label("title".to_string()));
        assert_eq!(
            grid.render_header("category").unwrap(),
            HeaderCell::Custom("<th>Category -</th>".to_string())
        );
        assert!(grid.render_header("price").is_err());
    }

    #[test]
    fn cells_prefer_custom_renderer() {
        let grid = grid();
        let row = &products()[0];
        assert_eq!(grid.render_cell("title", row).unwrap(), Cell::Text("Boots".to_string()));
        assert_eq!(
            grid.render_cell("category", row).unwrap(),
            Cell::Custom("<td><= shoes =></td>".to_string())
        );
    }

    #[test]
    fn render_follows_the_derived_view() {
        let mut grid = grid();
        grid.dispatch(SortFilterAction::FilterBy {
            key: "category",
            value: vec!["ACC".to_string()],
        })
        .unwrap();
        grid.dispatch(SortFilterAction::SortBy {
            key: "title",
            order: SortOrder::Asc,
        })
        .unwrap();
        let rendered = grid.render().unwrap();
        assert_eq!(rendered.columns, vec!["title", "category"]);
        let titles: Vec<_> = rendered.rows.iter().map(|r| r[0].as_text().unwrap().to_string()).collect();
        assert_eq!(titles, vec!["Belt", "Scarf"]);
        assert_eq!(rendered.applied, 0);
    }

    #[test]
    fn renderer_actions_apply_after_the_pass() {
        let cols = columns().with(
            "title",
            DataGridConfig::new(|p: &Product| p.title.clone())
                .sort(|p: &Product| p.title.clone())
                .th(|key, ctx| {
                    if ctx.sorted_by().is_none() {
                        ctx.toggle_sort(key);
                    }
                    HeaderCell::Label("Title".to_string())
                }),
        );
        let mut grid = DataGridFactory::new(cols, SortFilterOptions::default()).mount(products(), &SyncEnv::default());

        let first = grid.render().unwrap();
        assert_eq!(first.applied, 1);
        assert_eq!(first.rows[0][0].as_text(), Some("Boots"));
        assert_eq!(
            grid.sort_filter().sorted_by().map(|s| (s.key, s.order)),
            Some(("title", SortOrder::Asc))
        );

        let second = grid.render().unwrap();
        assert_eq!(second.applied, 0);
        assert_eq!(second.rows[0][0].as_text(), Some("Belt"));
        assert_eq!(second.headers[1], HeaderCell::Custom("<th>Category -</th>".to_string()));
    }

    #[test]
    fn failed_renderer_actions_are_skipped() {
        let mut grid = grid();
        GridContext::new(grid.sort_filter(), grid.columns(), &grid.pending).toggle_sort("price");
        assert_eq!(grid.apply_pending(), 0);
        assert!(grid.sort_filter().sorted_by().is_none());
    }

    #[test]
    fn default_sort_is_reflected_in_custom_header() {
        let cols = columns();
        let map = cols.sort_filter_map();
        let options = SortFilterOptions {
            default_sort: Some(SortedBy::new(&map, "category", SortOrder::Desc).unwrap()),
            ..SortFilterOptions::default()
        };
        let grid = DataGridFactory::new(cols, options).mount(products(), &SyncEnv::default());
        assert_eq!(
            grid.render_header("category").unwrap(),
            HeaderCell::Custom("<th>Category desc</th>".to_string())
        );
    }
}
