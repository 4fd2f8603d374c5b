use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::TableCache;
use crate::config::DashboardConfig;
use crate::data::filter::{self, FilterField, FilterSelection};
use crate::data::loader::Source;
use crate::data::load_table;
use crate::data::model::Table;
use crate::error::Result;
use crate::report::{build_report, Report};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Where the table is read from.
    pub source: Source,

    cache: TableCache,

    /// Normalized table (None until the first successful load).
    pub table: Option<Arc<Table>>,

    /// Current multi-select choices.
    pub selection: FilterSelection,

    /// Values offered by each multi-select, as seen in the loaded table.
    pub options: BTreeMap<FilterField, Vec<String>>,

    /// Charts, metrics and detail rows for the current selection.
    pub report: Option<Report>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// After a failed read, the next automatic attempt waits for this instant.
    retry_after: Option<Instant>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            source: config.source(),
            cache: TableCache::new(config.cache_ttl()),
            config,
            table: None,
            selection: FilterSelection::default(),
            options: BTreeMap::new(),
            report: None,
            status_message: None,
            retry_after: None,
        }
    }

    /// Load (or fetch from cache) and recompute. Errors end up in
    /// `status_message`.
    pub fn load(&mut self) {
        if let Err(e) = self.try_load() {
            log::error!("Failed to load {}: {e}", self.source);
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    pub fn try_load(&mut self) -> Result<()> {
        let source = self.source.clone();
        let schema = self.config.columns.clone();
        let decimal = self.config.source.decimal_separator;
        let timeout = self.config.http_timeout();
        let loaded = self
            .cache
            .get_or_load(|| load_table(&source, &schema, decimal, timeout));
        self.retry_after = match (&loaded, self.config.cache_ttl()) {
            (Err(_), Some(ttl)) => Some(Instant::now() + ttl),
            _ => None,
        };
        let table = loaded?;

        if !self.table.as_ref().is_some_and(|t| Arc::ptr_eq(t, &table)) {
            self.options = filter_options(&table, &self.config);
            self.table = Some(table);
        }
        self.status_message = None;
        self.try_refresh()
    }

    /// Drop the cached table and read the source again.
    pub fn reload(&mut self) {
        self.cache.invalidate();
        self.load();
    }

    /// Switch to another source; selections from the old one are cleared.
    pub fn set_source(&mut self, source: Source) {
        log::info!("Switching source to {source}");
        self.source = source;
        self.selection.clear_all();
        self.table = None;
        self.report = None;
        self.reload();
    }

    /// Reload when the cached table has expired. Called once per frame; a
    /// failed read is tried again only after another cache window.
    pub fn ensure_fresh(&mut self) {
        let now = Instant::now();
        if self.retry_after.is_some_and(|at| now < at) {
            return;
        }
        if self.table.is_some() && !self.cache.is_fresh(now) {
            log::info!("Cached table expired, reloading {}", self.source);
            self.load();
        }
    }

    pub fn toggle_filter_value(&mut self, field: FilterField, value: &str) {
        self.selection.toggle(field, value);
        self.refresh();
    }

    pub fn clear_filter(&mut self, field: FilterField) {
        self.selection.clear(field);
        self.refresh();
    }

    pub fn clear_all_filters(&mut self) {
        self.selection.clear_all();
        self.refresh();
    }

    /// Recompute the report after a filter change.
    pub fn refresh(&mut self) {
        if let Err(e) = self.try_refresh() {
            log::error!("Failed to build report: {e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    /// On failure the report is cleared so charts of an older table are not
    /// shown next to the current one.
    pub fn try_refresh(&mut self) -> Result<()> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        let schema = &self.config.columns;
        let report = filter::apply(table, &self.selection.constraints(schema))
            .and_then(|filtered| build_report(&filtered, schema));
        match report {
            Ok(report) => {
                self.report = Some(report);
                Ok(())
            }
            Err(e) => {
                self.report = None;
                Err(e)
            }
        }
    }
}

fn filter_options(table: &Table, config: &DashboardConfig) -> BTreeMap<FilterField, Vec<String>> {
    FilterField::ALL
        .iter()
        .filter_map(|field| {
            let column = field.column(&config.columns);
            match table.unique_values(column) {
                Ok(values) => Some((*field, values)),
                Err(e) => {
                    log::warn!("no filter options for {field:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("dados.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Corretor Responsável ;Unidade da Corretora;Finalidade do Crédito;Status da Negociação;Crédito Desejado (R$);Data da Solicitação").unwrap();
        writeln!(f, "Ana;Centro;Imóvel;Aprovado;R$ 1.000,00;02/03/2024").unwrap();
        writeln!(f, "Bia;Sul;Veículo;Pendente;R$ 500,00;01/03/2024").unwrap();
        writeln!(f, "Ana;Sul;Imóvel;Pendente;xx;31/02/2024").unwrap();
        path
    }

    fn state_for(path: std::path::PathBuf) -> AppState {
        let mut config = DashboardConfig::default();
        config.source.path = Some(path);
        AppState::new(config)
    }

    #[test]
    fn load_filters_and_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_for(write_csv(&dir));
        state.try_load().unwrap();

        assert_eq!(state.options[&FilterField::Broker], vec!["Ana", "Bia"]);
        let report = state.report.as_ref().unwrap();
        assert_eq!(report.metrics.total_requests, 3);
        assert_eq!(report.metrics.total_amount, 1500.0);

        state.toggle_filter_value(FilterField::Status, "Pendente");
        let report = state.report.as_ref().unwrap();
        assert_eq!(report.metrics.total_requests, 2);
        assert_eq!(report.metrics.total_amount_display(), "R$ 500,00");

        state.clear_all_filters();
        assert_eq!(state.report.as_ref().unwrap().metrics.total_requests, 3);
        assert!(state.status_message.is_none());
    }

    #[test]
    fn missing_source_sets_status_message() {
        let mut state = state_for("/nonexistent/dados.csv".into());
        state.load();
        assert!(state.table.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("dados.csv"));
    }

    #[test]
    fn switching_source_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir);
        let mut state = state_for(path.clone());
        state.load();
        state.toggle_filter_value(FilterField::Broker, "Bia");
        assert_eq!(state.report.as_ref().unwrap().metrics.total_requests, 1);

        state.set_source(Source::File(path));
        assert_eq!(state.selection.active_count(), 0);
        assert_eq!(state.report.as_ref().unwrap().metrics.total_requests, 3);
    }

    #[test]
    fn reload_without_a_column_drops_old_charts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir);
        let mut state = state_for(path.clone());
        state.load();
        assert!(state.report.is_some());

        std::fs::write(
            &path,
            "Corretor Responsável;Unidade da Corretora;Finalidade do Crédito;Crédito Desejado (R$);Data da Solicitação\n\
             Ana;Centro;Imóvel;R$ 1.000,00;02/03/2024\n",
        )
        .unwrap();
        state.reload();

        assert_eq!(state.table.as_ref().unwrap().len(), 1);
        assert!(state.report.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("Status da Negociação"));
    }
}
