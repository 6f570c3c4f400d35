//! Query-string parameters for find-many: `filter[field]=value`, `sort=a,-b`, `include=x,y.z`.

use crate::codec::{coerce_query_value, ResourceCodec};
use crate::source::{AttributeFilter, SortSpec};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    pub filter: Vec<AttributeFilter>,
    pub sort: Vec<SortSpec>,
    pub include: Vec<String>,
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Comma-separated `include` paths, passed to the source as-is.
pub fn parse_include(pairs: &[(String, String)]) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == "include")
        .flat_map(|(_, v)| split_list(v).map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Translate wire filter/sort keys to internal attributes. Keys naming unknown fields are dropped.
pub fn parse_query_params(codec: &ResourceCodec, type_name: &str, pairs: &[(String, String)]) -> QueryParams {
    let mut params = QueryParams {
        include: parse_include(pairs),
        ..QueryParams::default()
    };
    for (key, value) in pairs {
        if let Some(field) = key.strip_prefix("filter[").and_then(|k| k.strip_suffix(']')) {
            match codec.record_attribute(type_name, field) {
                Some(attribute) => {
                    let kind = codec.schema().attribute(type_name, &attribute).map(|a| &a.kind);
                    params
                        .filter
                        .push(AttributeFilter::equal(attribute, coerce_query_value(kind, value)));
                }
                None => tracing::debug!(type_name, field, "dropping filter on unknown field"),
            }
        } else if key == "sort" {
            for entry in split_list(value) {
                let (field, descending) = match entry.strip_prefix('-') {
                    Some(field) => (field, true),
                    None => (entry, false),
                };
                match codec.record_attribute(type_name, field) {
                    Some(attribute) if descending => params.sort.push(SortSpec::descending(attribute)),
                    Some(attribute) => params.sort.push(SortSpec::ascending(attribute)),
                    None => tracing::debug!(type_name, field, "dropping sort on unknown field"),
                }
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeKind, ModelDefinition, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn codec() -> ResourceCodec {
        let schema = Schema::from_models([(
            "tag",
            ModelDefinition::new()
                .attribute("name", AttributeKind::String)
                .attribute("usageCount", AttributeKind::Number),
        )])
        .unwrap();
        ResourceCodec::new(Arc::new(schema)).unwrap()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_filters_sort_and_include() {
        let params = parse_query_params(
            &codec(),
            "tag",
            &pairs(&[
                ("filter[name]", "b"),
                ("filter[usage-count]", "3"),
                ("filter[color]", "red"),
                ("sort", "-usage-count,name,bogus"),
                ("include", "posts, posts.author"),
            ]),
        );
        assert_eq!(
            params.filter,
            vec![
                AttributeFilter::equal("name", "b"),
                AttributeFilter::equal("usageCount", json!(3)),
            ]
        );
        assert_eq!(
            params.sort,
            vec![SortSpec::descending("usageCount"), SortSpec::ascending("name")]
        );
        assert_eq!(params.include, vec!["posts", "posts.author"]);
    }

    #[test]
    fn id_is_filterable() {
        let params = parse_query_params(&codec(), "tag", &pairs(&[("filter[id]", "7"), ("sort", "-id")]));
        assert_eq!(params.filter, vec![AttributeFilter::equal("id", "7")]);
        assert_eq!(params.sort, vec![SortSpec::descending("id")]);
    }
}
