//! Per-request resolver scope and the batched relationship loader.
//!
//! A [`RequestScope`] is created for every GraphQL request and handed to the executor as request
//! data. Its loader coalesces every relationship lookup issued while one level of the selection
//! set resolves into a single source query, and its cache dies with the request.

use crate::error::SourceError;
use crate::record::{Identity, Record};
use crate::source::{query_one, AttributeFilter, Query, QueryExpression, QueryResult, RequestOptions, SortSpec, Source};
use async_graphql::dataloader::{DataLoader, HashMapCache, Loader};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelatedKey {
    pub parent: Identity,
    pub relationship: String,
}

pub struct RelatedLoader {
    source: Arc<dyn Source>,
    options: RequestOptions,
}

impl Loader<RelatedKey> for RelatedLoader {
    type Value = Vec<Record>;
    type Error = SourceError;

    async fn load(&self, keys: &[RelatedKey]) -> Result<HashMap<RelatedKey, Vec<Record>>, SourceError> {
        let schema = self.source.schema();
        let expressions = keys
            .iter()
            .map(|key| {
                let many = schema
                    .relationship(&key.parent.type_name, &key.relationship)
                    .map(|d| d.is_many())
                    .unwrap_or(true);
                let record = key.parent.clone();
                let relationship = key.relationship.clone();
                if many {
                    QueryExpression::FindRelatedRecords { record, relationship }
                } else {
                    QueryExpression::FindRelatedRecord { record, relationship }
                }
            })
            .collect();
        tracing::debug!(keys = keys.len(), "batch loading related records");
        let results = self.source.query(Query::new(expressions), &self.options).await?;
        if results.len() != keys.len() {
            return Err(SourceError::Internal(format!(
                "expected {} related results, source returned {}",
                keys.len(),
                results.len()
            )));
        }
        Ok(keys
            .iter()
            .cloned()
            .zip(results.into_iter().map(QueryResult::into_records))
            .collect())
    }
}

pub struct RequestScope {
    source: Arc<dyn Source>,
    options: RequestOptions,
    loader: DataLoader<RelatedLoader, HashMapCache>,
}

impl RequestScope {
    pub fn new(source: Arc<dyn Source>, options: RequestOptions) -> Self {
        let loader = RelatedLoader {
            source: source.clone(),
            options: options.clone(),
        };
        RequestScope {
            source,
            options,
            loader: DataLoader::with_cache(loader, tokio::spawn, HashMapCache::default()),
        }
    }

    pub async fn find_record(&self, identity: Identity) -> Result<Option<Record>, SourceError> {
        Ok(query_one(self.source.as_ref(), QueryExpression::FindRecord { record: identity }, &self.options)
            .await?
            .into_record())
    }

    pub async fn find_records(&self, type_name: &str, filter: Vec<AttributeFilter>, sort: Vec<SortSpec>) -> Result<Vec<Record>, SourceError> {
        let expression = QueryExpression::FindRecords {
            type_name: type_name.to_string(),
            filter,
            sort,
        };
        Ok(query_one(self.source.as_ref(), expression, &self.options)
            .await?
            .into_records())
    }

    /// Related records of `parent`, batched with every other lookup pending in this request.
    pub async fn related(&self, parent: Identity, relationship: String) -> Result<Vec<Record>, SourceError> {
        Ok(self
            .loader
            .load_one(RelatedKey { parent, relationship })
            .await?
            .unwrap_or_default())
    }
}
