//! SQL text for the relational graph backend.
//!
//! Every statement the `PostgreSQL` backend sends is assembled here. Only
//! validated identifiers (schema and table names) are ever interpolated;
//! values are always bound as positional parameters.
//!
//! # Traversal
//!
//! Traversal is a recursive CTE. The base case is the start node; the
//! recursive case joins `relationships` in the requested direction, carries a
//! `TEXT[]` of visited ids and refuses to step onto a node already in it:
//!
//! ```sql
//! WITH RECURSIVE traversal(entity_id, depth, path) AS (
//!     SELECT e.entity_id, 0, ARRAY[e.entity_id] FROM entities e WHERE ...
//!     UNION ALL
//!     SELECT r.to_entity_id, t.depth + 1, t.path || r.to_entity_id
//!     FROM traversal t JOIN relationships r ON r.from_entity_id = t.entity_id
//!     WHERE t.depth < $2 AND NOT (r.to_entity_id = ANY(t.path))
//! )
//! SELECT DISTINCT ON (entity_id) ... ORDER BY entity_id, depth
//! ```

use crate::models::graph::Direction;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Columns selected for a node, in decoding order.
pub const NODE_COLUMNS: &str = "entity_id, entity_type, name, description, metadata, tags";

/// Columns selected for an edge, in decoding order.
pub const EDGE_COLUMNS: &str = "relationship_id, from_entity_id, to_entity_id, relationship_type, weight, confidence, properties";

/// Parameters bound per row of a multi-row node insert.
pub const NODE_INSERT_PARAMS: usize = 6;

/// Parameters bound per row of a multi-row edge insert.
pub const EDGE_INSERT_PARAMS: usize = 7;

// Postgres truncates identifiers beyond 63 bytes
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap_or_else(|_| unreachable!()));

/// Validates a schema or table name.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the name is not a plain SQL identifier.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "invalid {kind} name '{name}': expected [A-Za-z_][A-Za-z0-9_]* (max 63 chars)"
        )))
    }
}

/// Validated table names and the statements over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTables {
    schema: String,
    entities: String,
    relationships: String,
}

impl SqlTables {
    /// Creates the table set, validating every identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any name is not a plain identifier.
    pub fn new(
        schema: impl Into<String>,
        entities: impl Into<String>,
        relationships: impl Into<String>,
    ) -> Result<Self> {
        let tables = Self {
            schema: schema.into(),
            entities: entities.into(),
            relationships: relationships.into(),
        };
        validate_identifier("schema", &tables.schema)?;
        validate_identifier("entities table", &tables.entities)?;
        validate_identifier("relationships table", &tables.relationships)?;
        Ok(tables)
    }

    /// Schema name.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Unqualified entities table name.
    #[must_use]
    pub fn entities_name(&self) -> &str {
        &self.entities
    }

    /// Unqualified relationships table name.
    #[must_use]
    pub fn relationships_name(&self) -> &str {
        &self.relationships
    }

    /// Schema-qualified, quoted entities table.
    #[must_use]
    pub fn entities(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.entities)
    }

    /// Schema-qualified, quoted relationships table.
    #[must_use]
    pub fn relationships(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.relationships)
    }

    /// Substitutes `{schema}`, `{entities}` and `{relationships}` in migration text.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{schema}", &self.schema)
            .replace("{entities}", &self.entities)
            .replace("{relationships}", &self.relationships)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Multi-row node insert: `$1..$6` for the first row, `$7..$12` for the second, ...
    #[must_use]
    pub fn insert_nodes(&self, rows: usize) -> String {
        format!(
            "INSERT INTO {} (entity_id, entity_type, name, description, metadata, tags) VALUES {}",
            self.entities(),
            values_clause(rows, NODE_INSERT_PARAMS)
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn select_node(&self) -> String {
        format!(
            "SELECT {NODE_COLUMNS} FROM {} WHERE entity_id = $1 AND deleted_at IS NULL",
            self.entities()
        )
    }

    /// `$1` id; locks the row for the rest of the transaction.
    #[must_use]
    pub fn select_node_for_update(&self) -> String {
        format!("{} FOR UPDATE", self.select_node())
    }

    /// `$1` ids (`TEXT[]`).
    #[must_use]
    pub fn select_nodes_by_ids(&self) -> String {
        format!(
            "SELECT {NODE_COLUMNS} FROM {} WHERE entity_id = ANY($1::text[]) AND deleted_at IS NULL ORDER BY entity_id",
            self.entities()
        )
    }

    /// `$1` ids; returns the ids that are live, share-locking them.
    #[must_use]
    pub fn lock_live_nodes(&self) -> String {
        format!(
            "SELECT entity_id FROM {} WHERE entity_id = ANY($1::text[]) AND deleted_at IS NULL FOR SHARE",
            self.entities()
        )
    }

    /// `$1` id, `$2` name, `$3` description, `$4` metadata.
    #[must_use]
    pub fn update_node(&self) -> String {
        format!(
            "UPDATE {} SET name = $2, description = $3, metadata = $4, updated_at = NOW() WHERE entity_id = $1 AND deleted_at IS NULL",
            self.entities()
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn soft_delete_node(&self) -> String {
        format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() WHERE entity_id = $1 AND deleted_at IS NULL",
            self.entities()
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn hard_delete_node(&self) -> String {
        format!("DELETE FROM {} WHERE entity_id = $1", self.entities())
    }

    /// `$1` node id.
    #[must_use]
    pub fn soft_delete_incident_edges(&self) -> String {
        format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() WHERE (from_entity_id = $1 OR to_entity_id = $1) AND deleted_at IS NULL",
            self.relationships()
        )
    }

    /// `$1` node id.
    #[must_use]
    pub fn hard_delete_incident_edges(&self) -> String {
        format!(
            "DELETE FROM {} WHERE from_entity_id = $1 OR to_entity_id = $1",
            self.relationships()
        )
    }

    /// `$1` labels (`TEXT[]` or NULL), `$2` filter keys (`TEXT[]` or NULL),
    /// `$3` filter values (`JSONB[]`, parallel to `$2`), `$4` limit.
    ///
    /// `name` and `description` live in columns, so they are folded back into
    /// the metadata document. Each filter value must equal the stored value as
    /// a whole document.
    #[must_use]
    pub fn find_nodes(&self) -> String {
        format!(
            "SELECT {NODE_COLUMNS} FROM {} \
             WHERE deleted_at IS NULL \
               AND ($1::text[] IS NULL OR tags && $1::text[]) \
               AND ($2::text[] IS NULL OR NOT EXISTS ( \
                   SELECT 1 FROM unnest($2::text[], $3::jsonb[]) AS f(key, value) \
                   WHERE (metadata || jsonb_strip_nulls(jsonb_build_object('name', name, 'description', description))) -> f.key \
                         IS DISTINCT FROM f.value)) \
             ORDER BY entity_id \
             LIMIT $4",
            self.entities()
        )
    }

    /// `$1` labels (`TEXT[]` or NULL).
    #[must_use]
    pub fn count_nodes(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL AND ($1::text[] IS NULL OR tags && $1::text[])",
            self.entities()
        )
    }

    /// Live nodes grouped by primary label.
    #[must_use]
    pub fn nodes_by_label(&self) -> String {
        format!(
            "SELECT entity_type, COUNT(*) FROM {} WHERE deleted_at IS NULL GROUP BY entity_type",
            self.entities()
        )
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Multi-row edge insert: seven parameters per row.
    #[must_use]
    pub fn insert_edges(&self, rows: usize) -> String {
        format!(
            "INSERT INTO {} (relationship_id, from_entity_id, to_entity_id, relationship_type, weight, confidence, properties) VALUES {}",
            self.relationships(),
            values_clause(rows, EDGE_INSERT_PARAMS)
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn select_edge(&self) -> String {
        format!(
            "SELECT {EDGE_COLUMNS} FROM {} WHERE relationship_id = $1 AND deleted_at IS NULL",
            self.relationships()
        )
    }

    /// `$1` id; locks the row for the rest of the transaction.
    #[must_use]
    pub fn select_edge_for_update(&self) -> String {
        format!("{} FOR UPDATE", self.select_edge())
    }

    /// `$1` ids (`TEXT[]`).
    #[must_use]
    pub fn select_edges_by_ids(&self) -> String {
        format!(
            "SELECT {EDGE_COLUMNS} FROM {} WHERE relationship_id = ANY($1::text[]) AND deleted_at IS NULL",
            self.relationships()
        )
    }

    /// `$1` node ids; live edges with both endpoints in the set.
    #[must_use]
    pub fn select_edges_among(&self) -> String {
        format!(
            "SELECT {EDGE_COLUMNS} FROM {} \
             WHERE from_entity_id = ANY($1::text[]) AND to_entity_id = ANY($1::text[]) AND deleted_at IS NULL \
             ORDER BY relationship_id",
            self.relationships()
        )
    }

    /// `$1` id, `$2` properties.
    #[must_use]
    pub fn update_edge(&self) -> String {
        format!(
            "UPDATE {} SET properties = $2, updated_at = NOW() WHERE relationship_id = $1 AND deleted_at IS NULL",
            self.relationships()
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn soft_delete_edge(&self) -> String {
        format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() WHERE relationship_id = $1 AND deleted_at IS NULL",
            self.relationships()
        )
    }

    /// `$1` id.
    #[must_use]
    pub fn hard_delete_edge(&self) -> String {
        format!(
            "DELETE FROM {} WHERE relationship_id = $1",
            self.relationships()
        )
    }

    /// `$1` types, `$2` source, `$3` target, `$4` limit (each may be NULL).
    #[must_use]
    pub fn find_edges(&self) -> String {
        format!(
            "SELECT {EDGE_COLUMNS} FROM {} \
             WHERE deleted_at IS NULL \
               AND ($1::text[] IS NULL OR relationship_type = ANY($1::text[])) \
               AND ($2::text IS NULL OR from_entity_id = $2::text) \
               AND ($3::text IS NULL OR to_entity_id = $3::text) \
             ORDER BY relationship_id \
             LIMIT $4",
            self.relationships()
        )
    }

    /// `$1` types (`TEXT[]` or NULL).
    #[must_use]
    pub fn count_edges(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL AND ($1::text[] IS NULL OR relationship_type = ANY($1::text[]))",
            self.relationships()
        )
    }

    /// Live edges grouped by type.
    #[must_use]
    pub fn edges_by_type(&self) -> String {
        format!(
            "SELECT relationship_type, COUNT(*) FROM {} WHERE deleted_at IS NULL GROUP BY relationship_type",
            self.relationships()
        )
    }

    /// Statements removing all graph data, relationships first.
    #[must_use]
    pub fn clear(&self) -> [String; 2] {
        [
            format!("DELETE FROM {}", self.relationships()),
            format!("DELETE FROM {}", self.entities()),
        ]
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Bounded traversal.
    ///
    /// `$1` start id, `$2` max depth (`INT4`), `$3` edge types, `$4` node
    /// labels, `$5` limit. Returns node columns followed by `depth` and `path`.
    #[must_use]
    pub fn traverse(&self, direction: Direction) -> String {
        let (join, next) = direction_terms(direction);
        let entities = self.entities();
        let relationships = self.relationships();
        format!(
            "WITH RECURSIVE traversal(entity_id, depth, path) AS ( \
                 SELECT e.entity_id, 0, ARRAY[e.entity_id] \
                 FROM {entities} e \
                 WHERE e.entity_id = $1 AND e.deleted_at IS NULL \
               UNION ALL \
                 SELECT {next}, t.depth + 1, t.path || {next} \
                 FROM traversal t \
                 JOIN {relationships} r ON {join} \
                 JOIN {entities} n ON n.entity_id = {next} AND n.deleted_at IS NULL \
                 WHERE t.depth < $2::int4 \
                   AND r.deleted_at IS NULL \
                   AND ($3::text[] IS NULL OR r.relationship_type = ANY($3::text[])) \
                   AND NOT ({next} = ANY(t.path)) \
             ), \
             reached AS ( \
                 SELECT DISTINCT ON (entity_id) entity_id, depth, path \
                 FROM traversal \
                 WHERE depth > 0 \
                 ORDER BY entity_id, depth, path \
             ) \
             SELECT {}, reached.depth, reached.path \
             FROM reached \
             JOIN {entities} e ON e.entity_id = reached.entity_id \
             WHERE ($4::text[] IS NULL OR e.tags && $4::text[]) \
             ORDER BY reached.depth, e.entity_id \
             LIMIT $5",
            qualified_node_columns("e")
        )
    }

    /// Simple outgoing paths between two nodes, cheapest first per length.
    ///
    /// `$1` start id, `$2` end id, `$3` max depth (`INT4`), `$4` edge types,
    /// `$5` limit. Branches stop extending once they reach `$2`. Returns
    /// `path`, `edge_path`, `depth` and `cost`.
    #[must_use]
    pub fn paths(&self) -> String {
        let entities = self.entities();
        let relationships = self.relationships();
        format!(
            "WITH RECURSIVE search(entity_id, depth, path, edge_path, cost) AS ( \
                 SELECT e.entity_id, 0, ARRAY[e.entity_id], ARRAY[]::text[], 0.0::float8 \
                 FROM {entities} e \
                 WHERE e.entity_id = $1 AND e.deleted_at IS NULL \
               UNION ALL \
                 SELECT r.to_entity_id, s.depth + 1, s.path || r.to_entity_id, \
                        s.edge_path || r.relationship_id, \
                        s.cost + GREATEST(0.0, 1.0 - r.weight * r.confidence) \
                 FROM search s \
                 JOIN {relationships} r ON r.from_entity_id = s.entity_id \
                 JOIN {entities} n ON n.entity_id = r.to_entity_id AND n.deleted_at IS NULL \
                 WHERE s.depth < $3::int4 \
                   AND s.entity_id <> $2 \
                   AND r.deleted_at IS NULL \
                   AND ($4::text[] IS NULL OR r.relationship_type = ANY($4::text[])) \
                   AND NOT (r.to_entity_id = ANY(s.path)) \
             ) \
             SELECT path, edge_path, depth, cost \
             FROM search \
             WHERE entity_id = $2 AND depth > 0 \
             ORDER BY depth, cost \
             LIMIT $5"
        )
    }

    /// 1-hop neighbors.
    ///
    /// `$1` node id, `$2` edge types, `$3` limit.
    #[must_use]
    pub fn neighbors(&self, direction: Direction) -> String {
        let (join, next) = direction_terms(direction);
        // The relationship alias is joined to a one-row stand-in for the traversal frontier.
        format!(
            "SELECT {NODE_COLUMNS} FROM {} \
             WHERE deleted_at IS NULL \
               AND entity_id <> $1 \
               AND entity_id IN ( \
                   SELECT {next} \
                   FROM (SELECT $1::text AS entity_id) t \
                   JOIN {} r ON {join} \
                   WHERE r.deleted_at IS NULL \
                     AND ($2::text[] IS NULL OR r.relationship_type = ANY($2::text[])) \
               ) \
             ORDER BY entity_id \
             LIMIT $3",
            self.entities(),
            self.relationships()
        )
    }
}

/// Join condition and next-node expression for a direction, relative to the
/// frontier alias `t` and relationship alias `r`.
fn direction_terms(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Outgoing => ("r.from_entity_id = t.entity_id", "r.to_entity_id"),
        Direction::Incoming => ("r.to_entity_id = t.entity_id", "r.from_entity_id"),
        Direction::Both => (
            "(r.from_entity_id = t.entity_id OR r.to_entity_id = t.entity_id)",
            "(CASE WHEN r.from_entity_id = t.entity_id THEN r.to_entity_id ELSE r.from_entity_id END)",
        ),
    }
}

fn qualified_node_columns(alias: &str) -> String {
    NODE_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `($1, $2), ($3, $4)` style placeholders.
fn values_clause(rows: usize, per_row: usize) -> String {
    let mut out = String::new();
    for row in 0..rows {
        if row > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for col in 0..per_row {
            if col > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "${}", row * per_row + col + 1);
        }
        out.push(')');
    }
    out
}

/// Rewrites `$name` placeholders into positional `$n` ones.
///
/// Returns the rewritten query and the parameter names in positional order.
/// Repeated names share one position. Placeholders inside single-quoted
/// strings, quoted identifiers, `--` comments and `$$` bodies are left alone.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the query mixes named and positional
/// placeholders.
pub fn rewrite_named_params(query: &str) -> Result<(String, Vec<String>)> {
    let chars: Vec<char> = query.chars().collect();
    let mut out = String::with_capacity(query.len());
    let mut names: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut positional = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = scan_quoted(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            },
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            },
            '$' if chars.get(i + 1) == Some(&'$') => {
                let end = find_dollar_close(&chars, i + 2);
                out.extend(&chars[i..end]);
                i = end;
            },
            '$' if chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                positional = true;
                out.push(c);
                i += 1;
            },
            '$' if chars
                .get(i + 1)
                .is_some_and(|ch| ch.is_ascii_alphabetic() || *ch == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let position = match positions.get(&name) {
                    Some(p) => *p,
                    None => {
                        names.push(name.clone());
                        positions.insert(name, names.len());
                        names.len()
                    },
                };
                let _ = write!(out, "${position}");
                i = end;
            },
            _ => {
                out.push(c);
                i += 1;
            },
        }
    }

    if positional && !names.is_empty() {
        return Err(Error::InvalidInput(
            "query mixes named ($name) and positional ($1) parameters".to_string(),
        ));
    }
    Ok((out, names))
}

/// Index just past the closing quote (doubled quotes are escapes).
fn scan_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Index just past the closing `$$`.
fn find_dollar_close(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '$' && chars[i + 1] == '$' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}
