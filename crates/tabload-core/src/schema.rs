//! Schema Resolver: per-column physical type decisions and idempotent
//! table-definition statements.
//!
//! The decision chain is an ordered list of predicate/outcome rules,
//! evaluated first-match-wins, so each rule can be tested on its own.
//! Resolution is total: an inconsistent extract degrades to an
//! all-TEXT schema for the same column list instead of failing the
//! load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalogue::Catalogue;
use crate::extract::{Cell, Extract, ValueKind};

/// Column names that must keep leading zeros and formatting; any type
/// signal to the contrary is ignored.
const TEXT_KEYWORDS: &[&str] = &["phone", "fax", "phonenumber"];

/// Table-name substrings known from prior runs to carry sentinel
/// values far outside ordinary integer range.
const LARGE_MAGNITUDE_TABLES: &[&str] = &["fs220l", "fs220d", "fs220e", "fs220f"];

/// Physical column types the target store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalType {
    Integer,
    SmallInt,
    BigInt,
    Numeric,
    Timestamp,
    Text,
}

impl PhysicalType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            PhysicalType::Integer => "INTEGER",
            PhysicalType::SmallInt => "SMALLINT",
            PhysicalType::BigInt => "BIGINT",
            PhysicalType::Numeric => "NUMERIC",
            PhysicalType::Timestamp => "TIMESTAMP",
            PhysicalType::Text => "TEXT",
        }
    }
}

/// Which stage of the decision chain produced a column's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSource {
    /// Join-key pinning, high-risk keyword, or table-class override.
    Heuristic,
    /// Declared type from the catalogue.
    Catalogue,
    /// Statistical fallback over the parsed values.
    Inferred,
}

/// Final decision for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPlan {
    /// Sanitized identifier, unique within the table.
    pub name: String,
    pub physical: PhysicalType,
    pub source: PlanSource,
}

/// Resolved schema for one table: normalized identifier, ordered
/// column plans, and a synthetic primary key emitted by the DDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnPlan>,
}

impl TableSchema {
    /// Idempotent table-definition statement. Never destructive:
    /// dropping an existing table is the caller's decision, never
    /// implicit here.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|plan| format!("{} {}", plan.name, plan.physical.sql_name()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id SERIAL PRIMARY KEY, {});",
            self.table,
            columns.join(", ")
        )
    }

    /// Single-column fallback table, used when the full statement is
    /// rejected and columns are then added one at a time.
    pub fn minimal_create_sql(&self) -> String {
        format!("CREATE TABLE IF NOT EXISTS {} (id SERIAL PRIMARY KEY);", self.table)
    }

    pub fn add_column_sql(&self, plan: &ColumnPlan) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {};",
            self.table,
            plan.name,
            plan.physical.sql_name()
        )
    }
}

/// Lowercase an identifier and replace every non-alphanumeric
/// character with an underscore.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Normalized table identifier from a file stem and an optional
/// period suffix (the period comes from the archive collaborator).
pub fn table_identifier(file_stem: &str, period: Option<&str>) -> String {
    let base = sanitize_identifier(file_stem);
    match period {
        Some(period) => format!("{}_{}", base, sanitize_identifier(period)),
        None => base,
    }
}

/// Resolve the physical schema for one extract.
///
/// Total by contract: any internal inconsistency degrades to an
/// all-TEXT schema for the same columns, with the cause logged.
pub fn resolve(extract: &Extract, catalogue: &Catalogue, table_id: &str) -> TableSchema {
    match try_resolve(extract, catalogue, table_id) {
        Ok(schema) => schema,
        Err(reason) => {
            log::error!(
                "schema resolution for {} degraded to all-text columns: {}",
                table_id,
                reason
            );
            all_text_schema(extract, table_id)
        }
    }
}

fn try_resolve(
    extract: &Extract,
    catalogue: &Catalogue,
    table_id: &str,
) -> Result<TableSchema, String> {
    let column_count = extract.columns.len();
    for (row_idx, row) in extract.rows.iter().enumerate() {
        if row.len() != column_count {
            return Err(format!(
                "row {} has {} cells for {} columns",
                row_idx,
                row.len(),
                column_count
            ));
        }
    }
    if extract.kinds.len() != column_count {
        return Err(format!(
            "{} inferred kinds for {} columns",
            extract.kinds.len(),
            column_count
        ));
    }

    let large_magnitude = is_large_magnitude_table(table_id);
    let names = unique_column_names(&extract.columns, table_id);

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let (physical, source) = resolve_column(extract, catalogue, idx, large_magnitude);
            ColumnPlan { name, physical, source }
        })
        .collect();

    Ok(TableSchema { table: table_id.to_string(), columns })
}

fn all_text_schema(extract: &Extract, table_id: &str) -> TableSchema {
    let columns = unique_column_names(&extract.columns, table_id)
        .into_iter()
        .map(|name| ColumnPlan {
            name,
            physical: PhysicalType::Text,
            source: PlanSource::Inferred,
        })
        .collect();
    TableSchema { table: table_id.to_string(), columns }
}

pub fn is_large_magnitude_table(table_id: &str) -> bool {
    let lower = table_id.to_lowercase();
    LARGE_MAGNITUDE_TABLES.iter().any(|t| lower.contains(t))
}

/// Sanitize raw header names and suffix collisions `_1`, `_2`, … in
/// first-seen order. A collision usually means a malformed header
/// row, so it is logged.
pub fn unique_column_names(raw_names: &[String], table_id: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in raw_names {
        *counts.entry(sanitize_identifier(raw)).or_insert(0) += 1;
    }
    let duplicates: Vec<&String> =
        counts.iter().filter(|(_, &n)| n > 1).map(|(name, _)| name).collect();
    if !duplicates.is_empty() {
        log::warn!("duplicate column names in {}: {:?}", table_id, duplicates);
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    raw_names
        .iter()
        .map(|raw| {
            let clean = sanitize_identifier(raw);
            match seen.get_mut(&clean) {
                Some(n) => {
                    *n += 1;
                    format!("{}_{}", clean, n)
                }
                None => {
                    seen.insert(clean.clone(), 0);
                    clean
                }
            }
        })
        .collect()
}

/// The ordered rule chain. First rule to produce an outcome wins.
fn resolve_column(
    extract: &Extract,
    catalogue: &Catalogue,
    idx: usize,
    large_magnitude: bool,
) -> (PhysicalType, PlanSource) {
    let rules: &[fn(&RuleContext) -> Option<(PhysicalType, PlanSource)>] = &[
        join_key_rule,
        keyword_rule,
        table_class_rule,
        catalogue_rule,
        inference_rule,
    ];

    let ctx = RuleContext {
        raw_name: &extract.columns[idx],
        lower_name: extract.columns[idx].trim().to_lowercase(),
        kind: extract.kinds[idx],
        extract,
        idx,
        catalogue,
        large_magnitude,
    };

    for rule in rules {
        if let Some(outcome) = rule(&ctx) {
            return outcome;
        }
    }
    // The inference rule always decides; this is the safety net for
    // an edit that breaks that property.
    (PhysicalType::Text, PlanSource::Inferred)
}

struct RuleContext<'a> {
    raw_name: &'a str,
    lower_name: String,
    kind: ValueKind,
    extract: &'a Extract,
    idx: usize,
    catalogue: &'a Catalogue,
    large_magnitude: bool,
}

/// Cross-table join keys carry one physical type everywhere.
fn join_key_rule(ctx: &RuleContext) -> Option<(PhysicalType, PlanSource)> {
    let physical = match sanitize_identifier(&ctx.lower_name).as_str() {
        "cu_number" | "join_number" => PhysicalType::Integer,
        "cycle_date" => PhysicalType::Timestamp,
        _ => return None,
    };
    Some((physical, PlanSource::Heuristic))
}

/// Leading zeros and formatting must survive in phone-class columns.
fn keyword_rule(ctx: &RuleContext) -> Option<(PhysicalType, PlanSource)> {
    if TEXT_KEYWORDS.iter().any(|kw| ctx.lower_name.contains(kw)) {
        return Some((PhysicalType::Text, PlanSource::Heuristic));
    }
    None
}

/// Tables known to carry sentinel integers outside ordinary range get
/// arbitrary-precision numerics wholesale; a narrower type would
/// reject the load outright.
fn table_class_rule(ctx: &RuleContext) -> Option<(PhysicalType, PlanSource)> {
    if !ctx.large_magnitude {
        return None;
    }
    let physical = if ctx.kind.is_numeric() {
        PhysicalType::Numeric
    } else if ctx.kind == ValueKind::Timestamp {
        PhysicalType::Timestamp
    } else {
        PhysicalType::Text
    };
    Some((physical, PlanSource::Heuristic))
}

fn catalogue_rule(ctx: &RuleContext) -> Option<(PhysicalType, PlanSource)> {
    let declared = ctx.catalogue.lookup(ctx.raw_name)?;
    Some((map_declared_type(declared), PlanSource::Catalogue))
}

/// Fixed mapping from declared catalogue types to physical types.
/// Unrecognized declarations fall back to TEXT.
fn map_declared_type(declared: &str) -> PhysicalType {
    match declared.trim().to_lowercase().as_str() {
        "int" => PhysicalType::Integer,
        "smallint" => PhysicalType::SmallInt,
        "bigint" => PhysicalType::BigInt,
        "varchar" | "char" => PhysicalType::Text,
        "date" | "smalldatetime" => PhysicalType::Timestamp,
        "decimal" | "float" => PhysicalType::Numeric,
        _ => PhysicalType::Text,
    }
}

/// Statistical fallback on the inferred value kind.
fn inference_rule(ctx: &RuleContext) -> Option<(PhysicalType, PlanSource)> {
    let physical = match ctx.kind {
        ValueKind::Integer => integer_physical_type(ctx.extract, ctx.idx),
        ValueKind::Float => PhysicalType::Numeric,
        ValueKind::Timestamp => PhysicalType::Timestamp,
        ValueKind::Text => PhysicalType::Text,
    };
    Some((physical, PlanSource::Inferred))
}

/// INTEGER only when every observed value fits the signed 32-bit
/// range. Missing or contradictory evidence widens to NUMERIC rather
/// than risking a rejected load.
fn integer_physical_type(extract: &Extract, idx: usize) -> PhysicalType {
    let mut bounds: Option<(i64, i64)> = None;
    for cell in extract.column_cells(idx) {
        match cell {
            Cell::Int(v) => {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
                    None => (*v, *v),
                });
            }
            _ => return PhysicalType::Numeric,
        }
    }
    match bounds {
        Some((lo, hi)) if lo < i64::from(i32::MIN) || hi > i64::from(i32::MAX) => {
            log::info!(
                "column {} has values outside 32-bit range (min={}, max={}), using NUMERIC",
                extract.columns[idx],
                lo,
                hi
            );
            PhysicalType::Numeric
        }
        Some(_) => PhysicalType::Integer,
        None => PhysicalType::Numeric,
    }
}
