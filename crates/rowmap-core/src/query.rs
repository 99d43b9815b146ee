//! Typed query objects.
//!
//! A [`SqlQuery`] pairs a command initializer with its bound parameters and
//! mapping options. Every terminal method runs one execution through an
//! [`Executor`]; the query itself is never consumed and can be run again.

use std::marker::PhantomData;

use crate::command::{CommandInit, Parameter, RawSql, StoredProcedure};
use crate::connection::{AsyncConnectionProvider, ConnectionProvider};
use crate::cursor;
use crate::error::Result;
use crate::executor::Executor;
use crate::materialize::FromRow;
use crate::options::MapOptions;
use crate::table::DataTable;

pub struct SqlQuery<'p, T, P: ?Sized, I = RawSql> {
    provider: &'p P,
    init: I,
    parameters: Vec<Parameter>,
    options: MapOptions,
    _target: PhantomData<fn() -> T>,
}

/// A query running literal SQL text.
pub fn sql_query<'p, T, P: ?Sized>(
    provider: &'p P,
    sql: impl Into<String>,
    parameters: Vec<Parameter>,
) -> SqlQuery<'p, T, P, RawSql> {
    SqlQuery::new(provider, RawSql(sql.into()), parameters)
}

/// A query invoking a stored routine by name.
pub fn stored_procedure<'p, T, P: ?Sized>(
    provider: &'p P,
    name: impl Into<String>,
    parameters: Vec<Parameter>,
) -> SqlQuery<'p, T, P, StoredProcedure> {
    SqlQuery::new(provider, StoredProcedure(name.into()), parameters)
}

impl<'p, T, P: ?Sized, I: CommandInit> SqlQuery<'p, T, P, I> {
    pub fn new(provider: &'p P, init: I, parameters: Vec<Parameter>) -> Self {
        Self {
            provider,
            init,
            parameters,
            options: MapOptions::default(),
            _target: PhantomData,
        }
    }

    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn executor(&self) -> Executor<'_, P> {
        Executor::new(self.provider, &self.parameters)
    }
}

impl<T: FromRow, P: ConnectionProvider + ?Sized, I: CommandInit> SqlQuery<'_, T, P, I> {
    pub fn to_list(&self) -> Result<Vec<T>> {
        self.executor()
            .execute(&self.init, |c| cursor::to_list(c, &self.options))
    }

    pub fn first(&self) -> Result<T> {
        self.executor()
            .execute(&self.init, |c| cursor::first(c, &self.options))
    }

    pub fn first_or_default(&self) -> Result<Option<T>> {
        self.executor()
            .execute(&self.init, |c| cursor::first_or_default(c, &self.options))
    }

    pub fn single(&self) -> Result<T> {
        self.executor()
            .execute(&self.init, |c| cursor::single(c, &self.options))
    }

    pub fn single_or_default(&self) -> Result<Option<T>> {
        self.executor()
            .execute(&self.init, |c| cursor::single_or_default(c, &self.options))
    }

    pub fn to_table(&self) -> Result<DataTable> {
        self.executor().execute(&self.init, |c| cursor::to_table(c))
    }
}

impl<T, P, I> SqlQuery<'_, T, P, I>
where
    T: FromRow,
    P: AsyncConnectionProvider + ?Sized,
    I: CommandInit + Sync,
{
    pub async fn to_list_async(&self) -> Result<Vec<T>> {
        let options = self.options;
        self.executor()
            .execute_async(&self.init, |mut c| async move {
                cursor::to_list_async(&mut c, &options).await
            })
            .await
    }

    pub async fn first_async(&self) -> Result<T> {
        let options = self.options;
        self.executor()
            .execute_async(&self.init, |mut c| async move {
                cursor::first_async(&mut c, &options).await
            })
            .await
    }

    pub async fn first_or_default_async(&self) -> Result<Option<T>> {
        let options = self.options;
        self.executor()
            .execute_async(&self.init, |mut c| async move {
                cursor::first_or_default_async(&mut c, &options).await
            })
            .await
    }

    pub async fn single_async(&self) -> Result<T> {
        let options = self.options;
        self.executor()
            .execute_async(&self.init, |mut c| async move {
                cursor::single_async(&mut c, &options).await
            })
            .await
    }

    pub async fn single_or_default_async(&self) -> Result<Option<T>> {
        let options = self.options;
        self.executor()
            .execute_async(&self.init, |mut c| async move {
                cursor::single_or_default_async(&mut c, &options).await
            })
            .await
    }

    pub async fn to_table_async(&self) -> Result<DataTable> {
        self.executor()
            .execute_async(&self.init, |mut c| async move { cursor::to_table_async(&mut c).await })
            .await
    }
}

/// Query entry points for a connection provider.
pub trait DatabaseExt {
    fn sql_query<T>(&self, sql: impl Into<String>, parameters: Vec<Parameter>) -> SqlQuery<'_, T, Self, RawSql> {
        sql_query(self, sql, parameters)
    }

    fn stored_procedure<T>(
        &self,
        name: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> SqlQuery<'_, T, Self, StoredProcedure> {
        stored_procedure(self, name, parameters)
    }
}
