//! Table browsing and querying over one database.

use std::sync::Arc;

use tracing::info;

use crate::catalog::{Catalog, Table, TableListing};
use crate::config::{QuerySettings, Settings};
use crate::database::{ConnectionSource, SqliteSource};
use crate::error::Result;
use crate::executor::{Executor, QueryResult};
use crate::planner::{PageSize, Planner, QueryRequest};
use crate::sql::Dialect;

/// Reflected catalog plus the connection source it came from.
pub struct TableService {
    source: Arc<dyn ConnectionSource>,
    catalog: Catalog,
    settings: QuerySettings,
}

impl TableService {
    /// Open the configured database and reflect its schema.
    pub fn connect(settings: &Settings) -> Result<Self> {
        let source = SqliteSource::from_settings(&settings.database)?;
        info!(path = %source.path().display(), "connecting");
        Self::new(Arc::new(source), settings.query.clone())
    }

    /// Reflect the schema behind `source`.
    pub fn new(source: Arc<dyn ConnectionSource>, settings: QuerySettings) -> Result<Self> {
        let catalog = Catalog::reflect(source.as_ref())?;
        Ok(Self {
            source,
            catalog,
            settings,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn list_tables(&self) -> TableListing {
        self.catalog.list_tables()
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.catalog.get_table(name)
    }

    /// A request for `table_name` using the configured page size.
    pub fn request(&self, table_name: &str) -> QueryRequest {
        QueryRequest::new(table_name).page_size(PageSize::Limited(self.settings.default_page_size))
    }

    /// Plan and run `request`.
    ///
    /// An empty projection yields an empty result without touching the
    /// database.
    pub fn query_table(&self, request: &QueryRequest) -> Result<QueryResult> {
        match Planner::new(&self.catalog).plan(request)? {
            Some(plan) => Executor::new(self.source.as_ref()).execute(&plan),
            None => Ok(QueryResult::default()),
        }
    }

    /// The SQL `request` would run, rendered for `dialect`.
    ///
    /// `None` when the projection is empty.
    pub fn explain(&self, request: &QueryRequest, dialect: Dialect) -> Result<Option<String>> {
        Ok(Planner::new(&self.catalog)
            .plan(request)?
            .map(|plan| plan.to_sql(dialect)))
    }

    /// Re-reflect the schema, replacing the catalog on success.
    pub fn reload(&mut self) -> Result<()> {
        self.catalog = Catalog::reflect(self.source.as_ref())?;
        Ok(())
    }
}
