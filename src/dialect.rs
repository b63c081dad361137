//! Dialect assembly: include closure, fingerprint/dispatch tables and the emissions of a run.
//!
//! Per-message work (planning, emission) is pure and may run on scoped threads. Tables are
//! built afterwards by folding per-message rows into a [`DialectTables`] accumulator, so
//! their order never depends on completion order.

use crate::ast::{Dialect, Message};
use crate::config::GeneratorConfig;
use crate::crc::FingerprintTable;
use crate::emit::{self, Emission, TableRow};
use crate::error::GenError;
use crate::frame::{DispatchEntry, DispatchTable};
use crate::layout::{plan_message, LayoutPlan};
use crate::render::Render;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Fingerprint and length tables of a dialect closure, ascending by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialectTables {
    pub fingerprints: FingerprintTable,
    rows: BTreeMap<u32, TableRow>,
    names: HashMap<String, u32>,
}

impl DialectTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one message's row; an id or name seen before is a configuration error.
    pub fn fold(mut self, row: TableRow) -> Result<Self, GenError> {
        if let Some(existing) = self.rows.get(&row.id) {
            return Err(GenError::DuplicateMessageId {
                id: row.id,
                first: format!("{}::{}", existing.dialect, existing.name),
                second: format!("{}::{}", row.dialect, row.name),
            });
        }
        if let Some(&first) = self.names.get(&row.name) {
            return Err(GenError::DuplicateMessageName {
                name: row.name,
                first,
                second: row.id,
            });
        }
        self.fingerprints.insert(row.id, row.fingerprint);
        self.names.insert(row.name.clone(), row.id);
        self.rows.insert(row.id, row);
        Ok(self)
    }

    pub fn rows(&self) -> impl Iterator<Item = &TableRow> + '_ {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn table_row(dialect: &str, message: &Message) -> TableRow {
    TableRow {
        id: message.id,
        dialect: dialect.to_string(),
        name: message.name.clone(),
        fingerprint: message.crc_extra,
        min_len: message.wire_min_length,
        len: message.wire_length,
    }
}

/// Loaded dialects by name.
#[derive(Debug, Clone, Default)]
pub struct DialectSet {
    dialects: Vec<Dialect>,
    index: HashMap<String, usize>,
}

impl DialectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dialect: Dialect) -> Result<(), GenError> {
        if self.index.contains_key(&dialect.name) {
            return Err(GenError::DuplicateDialect(dialect.name));
        }
        self.index.insert(dialect.name.clone(), self.dialects.len());
        self.dialects.push(dialect);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Dialect> {
        self.index.get(name).map(|&i| &self.dialects[i])
    }

    /// Dialects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Dialect> + '_ {
        self.dialects.iter()
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }

    /// `name` and everything it includes, transitively, includes first. Each dialect appears
    /// once, so include cycles terminate.
    pub fn closure(&self, name: &str) -> Result<Vec<&Dialect>, GenError> {
        let root = self.get(name).ok_or_else(|| GenError::UnknownDialect(name.to_string()))?;
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.visit(root, &mut visited, &mut out)?;
        Ok(out)
    }

    fn visit<'a>(
        &'a self,
        dialect: &'a Dialect,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<&'a Dialect>,
    ) -> Result<(), GenError> {
        if !visited.insert(dialect.name.as_str()) {
            return Ok(());
        }
        for include in &dialect.includes {
            let inner = self.get(include).ok_or_else(|| GenError::UnknownInclude {
                dialect: dialect.name.clone(),
                include: include.clone(),
            })?;
            self.visit(inner, visited, out)?;
        }
        out.push(dialect);
        Ok(())
    }

    /// Runtime dispatch table over the closures of `names`.
    pub fn dispatch_table(&self, names: &[&str]) -> Result<DispatchTable, GenError> {
        let mut seen = HashSet::new();
        let mut table = DispatchTable::new();
        for name in names {
            for d in self.closure(name)? {
                if !seen.insert(d.name.as_str()) {
                    continue;
                }
                for m in &d.messages {
                    table.insert(DispatchEntry {
                        dialect: d.name.clone(),
                        name: m.name.clone(),
                        fingerprint: m.crc_extra,
                        endianness: d.flags.endianness,
                        plan: plan_message(m, d.flags.sort_fields)?,
                    })?;
                }
            }
        }
        Ok(table)
    }
}

/// Planned and emitted message.
#[derive(Debug, Clone)]
pub struct MessageUnit {
    pub message_id: u32,
    pub name: String,
    pub fingerprint: u8,
    pub plan: LayoutPlan,
    pub emission: Emission,
}

/// Everything generated for one dialect.
#[derive(Debug, Clone)]
pub struct DialectOutput {
    pub name: String,
    pub tables: DialectTables,
    pub units: Vec<MessageUnit>,
    pub enums: Vec<Emission>,
    /// The dialect's `mod.rs`.
    pub module: Emission,
}

/// Result of a run, held in memory until [`Generation::write_to`].
#[derive(Debug, Clone)]
pub struct Generation {
    pub dialects: Vec<DialectOutput>,
    pub dispatch: DispatchTable,
    pub framing: Emission,
    pub root: Emission,
}

impl Generation {
    /// Every emission: per dialect its messages, enums and module, then framing and root.
    pub fn emissions(&self) -> impl Iterator<Item = &Emission> + '_ {
        self.dialects
            .iter()
            .flat_map(|d| {
                d.units
                    .iter()
                    .map(|u| &u.emission)
                    .chain(d.enums.iter())
                    .chain(std::iter::once(&d.module))
            })
            .chain([&self.framing, &self.root])
    }

    /// Write every emission under `dir`. Returns the number of files written.
    pub fn write_to(&self, dir: &Path) -> Result<usize, GenError> {
        let mut n = 0;
        for e in self.emissions() {
            let path = dir.join(&e.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &e.content)?;
            n += 1;
        }
        info!(dir = %dir.display(), files = n, "wrote generated sources");
        Ok(n)
    }
}

pub struct Generator<R> {
    config: GeneratorConfig,
    renderer: R,
}

impl<R: Render + Sync> Generator<R> {
    pub fn new(config: GeneratorConfig, renderer: R) -> Self {
        Generator { config, renderer }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn build_unit(&self, dialect: &Dialect, message: &Message) -> Result<MessageUnit, GenError> {
        let plan = plan_message(message, dialect.flags.sort_fields)?;
        let emission = emit::emit_message(&self.renderer, &self.config.runtime_crate, &dialect.name, message, &plan)?;
        Ok(MessageUnit {
            message_id: message.id,
            name: message.name.clone(),
            fingerprint: message.crc_extra,
            plan,
            emission,
        })
    }

    fn build_units(&self, dialect: &Dialect) -> Result<Vec<MessageUnit>, GenError> {
        let jobs = self.config.jobs.max(1);
        if jobs == 1 || dialect.messages.len() < 2 {
            return dialect.messages.iter().map(|m| self.build_unit(dialect, m)).collect();
        }
        let chunk = (dialect.messages.len() + jobs - 1) / jobs;
        std::thread::scope(|s| {
            let handles: Vec<_> = dialect
                .messages
                .chunks(chunk)
                .map(|part| {
                    s.spawn(move || {
                        part.iter()
                            .map(|m| self.build_unit(dialect, m))
                            .collect::<Result<Vec<_>, GenError>>()
                    })
                })
                .collect();
            let mut units = Vec::with_capacity(dialect.messages.len());
            for h in handles {
                match h.join() {
                    Ok(part) => units.extend(part?),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(units)
        })
    }

    /// Plan and emit one dialect. Tables cover the dialect and its includes; message and enum
    /// emissions cover the dialect's own definitions.
    pub fn assemble_dialect(&self, set: &DialectSet, name: &str) -> Result<DialectOutput, GenError> {
        let closure = set.closure(name)?;
        let dialect = set.get(name).ok_or_else(|| GenError::UnknownDialect(name.to_string()))?;

        let tables = closure
            .iter()
            .flat_map(|d| d.messages.iter().map(move |m| table_row(&d.name, m)))
            .try_fold(DialectTables::new(), DialectTables::fold)?;

        let units = self.build_units(dialect)?;
        for u in &units {
            tables.fingerprints.lookup(u.message_id)?;
        }
        let enums = dialect
            .enums
            .iter()
            .map(|e| emit::emit_enum(&self.renderer, &dialect.name, e))
            .collect::<Result<Vec<_>, _>>()?;
        let rows: Vec<TableRow> = tables.rows().cloned().collect();
        let module = emit::emit_dialect(&self.renderer, &self.config.runtime_crate, dialect, &rows)?;

        info!(
            dialect = %dialect.name,
            messages = units.len(),
            enums = enums.len(),
            table = tables.len(),
            includes = closure.len() - 1,
            "assembled dialect"
        );
        Ok(DialectOutput {
            name: dialect.name.clone(),
            tables,
            units,
            enums,
            module,
        })
    }

    /// Assemble every dialect of `set` and the run-wide dispatch table and framing module.
    pub fn run(&self, set: &DialectSet) -> Result<Generation, GenError> {
        let mut dialects = Vec::with_capacity(set.len());
        let mut dispatch = DispatchTable::new();
        for d in set.iter() {
            let out = self.assemble_dialect(set, &d.name)?;
            for u in &out.units {
                dispatch.insert(DispatchEntry {
                    dialect: d.name.clone(),
                    name: u.name.clone(),
                    fingerprint: u.fingerprint,
                    endianness: d.flags.endianness,
                    plan: u.plan.clone(),
                })?;
            }
            dialects.push(out);
        }

        let rows: Vec<TableRow> = dispatch
            .iter()
            .map(|(id, e)| TableRow {
                id,
                dialect: e.dialect.clone(),
                name: e.name.clone(),
                fingerprint: e.fingerprint,
                min_len: e.plan.base_len,
                len: e.plan.full_len,
            })
            .collect();
        let framing = emit::emit_framing(&self.renderer, &self.config.runtime_crate, &rows)?;
        let names: Vec<&str> = set.iter().map(|d| d.name.as_str()).collect();
        let root = emit::emit_root(&self.renderer, &names)?;
        debug!(messages = dispatch.len(), dialects = dialects.len(), "run complete");

        Ok(Generation {
            dialects,
            dispatch,
            framing,
            root,
        })
    }
}
