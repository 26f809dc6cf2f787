//! Advanced results: field selection, sorting, pagination and filtering for
//! collection endpoints, translated into a PostgREST query string.

use std::collections::HashMap;

use serde::Serialize;

use shared_models::validation::ValidationErrors;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "eq" => Some(FilterOp::Eq),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    fn as_postgrest(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    fn to_postgrest(&self) -> String {
        let value = match self.op {
            FilterOp::In => {
                let items: Vec<String> = self.value
                    .split(',')
                    .map(|v| urlencoding::encode(v.trim()).into_owned())
                    .collect();
                format!("({})", items.join(","))
            }
            _ => urlencoding::encode(&self.value).into_owned(),
        };
        format!("{}={}.{}", self.field, self.op.as_postgrest(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub select: Vec<String>,
    pub sort: Vec<SortKey>,
    pub page: u32,
    pub limit: u32,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl ListQuery {
    /// Parses raw query parameters. Only `fields` may be selected, sorted or
    /// filtered on; anything else is reported as a validation error.
    pub fn from_params(
        params: &HashMap<String, String>,
        fields: &[&str],
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let select = match params.get("select") {
            Some(raw) => split_list(raw)
                .into_iter()
                .filter(|f| {
                    let known = fields.contains(&f.as_str());
                    if !known {
                        errors.add("select", format!("Unknown field '{}'", f));
                    }
                    known
                })
                .collect(),
            None => Vec::new(),
        };

        let sort = match params.get("sort") {
            Some(raw) => split_list(raw)
                .into_iter()
                .filter_map(|key| {
                    let (field, descending) = match key.strip_prefix('-') {
                        Some(rest) => (rest.to_string(), true),
                        None => (key.clone(), false),
                    };
                    if fields.contains(&field.as_str()) {
                        Some(SortKey { field, descending })
                    } else {
                        errors.add("sort", format!("Unknown field '{}'", field));
                        None
                    }
                })
                .collect(),
            None => Vec::new(),
        };

        let page = parse_positive(params.get("page"), DEFAULT_PAGE, "page", &mut errors);
        let limit = parse_positive(params.get("limit"), DEFAULT_LIMIT, "limit", &mut errors)
            .min(MAX_LIMIT);

        let mut filters = Vec::new();
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        for key in keys {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let value = &params[key];

            let (field, op) = match key.split_once('[') {
                Some((field, rest)) => match rest.strip_suffix(']').and_then(FilterOp::parse) {
                    Some(op) => (field, op),
                    None => {
                        errors.add(field, format!("Unsupported filter operator in '{}'", key));
                        continue;
                    }
                },
                None => (key.as_str(), FilterOp::Eq),
            };

            if !fields.contains(&field) {
                errors.add(field, format!("Unknown field '{}'", field));
                continue;
            }

            filters.push(Filter {
                field: field.to_string(),
                op,
                value: value.clone(),
            });
        }

        errors.into_result()?;

        Ok(Self { select, sort, page, limit, filters })
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Renders the PostgREST query string. `embed` is appended to the select
    /// list (e.g. a reverse relation); `default_sort` applies when the caller
    /// gave no `sort`.
    pub fn to_postgrest(&self, embed: Option<&str>, default_sort: &str) -> String {
        let mut select: Vec<String> = if self.select.is_empty() {
            vec!["*".to_string()]
        } else {
            let mut columns = self.select.clone();
            if !columns.iter().any(|c| c == "id") {
                columns.insert(0, "id".to_string());
            }
            columns
        };
        if let Some(embed) = embed {
            select.push(embed.to_string());
        }

        let order = if self.sort.is_empty() {
            default_sort.to_string()
        } else {
            self.sort
                .iter()
                .map(|k| format!("{}.{}", k.field, if k.descending { "desc" } else { "asc" }))
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut parts = vec![
            format!("select={}", select.join(",")),
            format!("order={}", order),
        ];
        parts.extend(self.filters.iter().map(Filter::to_postgrest));
        parts.push(format!("limit={}", self.limit));
        parts.push(format!("offset={}", self.offset()));

        parts.join("&")
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        let end = self.page as u64 * self.limit as u64;

        Pagination {
            next: (end < total).then_some(PageRef { page: self.page + 1, limit: self.limit }),
            prev: (self.page > 1).then_some(PageRef { page: self.page - 1, limit: self.limit }),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_positive(raw: Option<&String>, default: u32, field: &str, errors: &mut ValidationErrors) -> u32 {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                errors.add(field, format!("'{}' must be a positive integer", field));
                default
            }
        },
    }
}
