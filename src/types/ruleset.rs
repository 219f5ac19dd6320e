use std::fmt;
use std::path::Path;

use log::{info, warn};

use super::apply_report::ApplyReport;
use super::error::CompileError;
use super::interner::Interner;
use super::pattern_cache::PatternCache;
use super::rule::{Op, Opcode, RuleId, RuleNode};
use super::sexpr::Sexpr;
use super::uevent::Uevent;
use crate::config::Config;
use crate::parse::ParseError;
use crate::tree::DeviceTree;

/// Compiled device rules plus everything they share: the node arena, the
/// pattern cache, interned owner names and the creation defaults.
///
/// Built once while rules load, then only read while events are applied.
///
/// # Example
///
/// ```
/// use dev9::{MemTree, RuleSet, Uevent};
///
/// let rules = RuleSet::from_source(
///     r#"(when (match (SUBSYSTEM . "^tty$")) (mknod DEV-BASE-PATH))"#,
/// )
/// .unwrap();
///
/// let mut tree = MemTree::new();
/// let event = Uevent::new("add@/devices/tty1")
///     .set("SUBSYSTEM", "tty")
///     .set("DEVPATH", "/devices/tty1")
///     .set("MAJOR", "4")
///     .set("MINOR", "1");
/// let _ = rules.apply(&event, &mut tree);
///
/// assert_eq!(tree.get("tty1").unwrap().permissions(), 0o660);
/// ```
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) nodes: Vec<RuleNode>,
    pub(crate) head: Option<RuleId>,
    pub(crate) tail: Option<RuleId>,
    pub(crate) patterns: PatternCache,
    pub(crate) interner: Interner,
    pub(crate) config: Config,
}

impl RuleSet {
    /// An empty rule set with default creation settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
            patterns: PatternCache::new(),
            interner: Interner::new(),
            config,
        }
    }

    /// Compile one directive form and append it to the top-level forest.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if the form was dropped. The forest is left
    /// exactly as it was.
    pub fn add(&mut self, form: &Sexpr) -> Result<RuleId, CompileError> {
        let id = crate::compile::compile(self, form)?;
        match self.tail {
            Some(last) => self.nodes[last.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        Ok(id)
    }

    /// Parse rule source and add every form it contains. Forms that fail to
    /// compile are logged and skipped.
    ///
    /// Returns the number of forms that were added.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the text is not well-formed; nothing is
    /// added in that case.
    pub fn load_str(&mut self, source: &str) -> Result<usize, ParseError> {
        let forms = crate::parse::parse(source)?;
        let mut added = 0;
        for form in &forms {
            match self.add(form) {
                Ok(_) => added += 1,
                Err(err) => warn!("dropping rule {form}: {err}"),
            }
        }
        Ok(added)
    }

    /// Read and load a rule file.
    ///
    /// # Errors
    ///
    /// Returns [`Dev9Error`](crate::Dev9Error) on I/O or syntax failure.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, crate::Dev9Error> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let added = self.load_str(&source)?;
        info!("loaded {added} rules from {}", path.display());
        Ok(added)
    }

    /// Build a rule set with default settings from source text.
    ///
    /// # Errors
    ///
    /// Returns [`Dev9Error`](crate::Dev9Error) on syntax failure.
    pub fn from_source(source: &str) -> Result<Self, crate::Dev9Error> {
        let mut rules = Self::new();
        rules.load_str(source)?;
        Ok(rules)
    }

    /// Build a rule set with default settings from a rule file.
    ///
    /// # Errors
    ///
    /// Returns [`Dev9Error`](crate::Dev9Error) on I/O or syntax failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Dev9Error> {
        let mut rules = Self::new();
        rules.load_file(path)?;
        Ok(rules)
    }

    /// Run the rule forest over one event, creating or updating device nodes
    /// in `tree`.
    pub fn apply<T: DeviceTree>(&self, event: &Uevent, tree: &mut T) -> ApplyReport {
        crate::evaluate::apply(self, event, tree)
    }

    /// Number of top-level rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.top_level().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of compiled nodes, nested `when` branches included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Opcodes of the top-level rules in execution order.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.top_level()
            .map(|id| self.nodes[id.0].op.opcode())
            .collect()
    }

    #[must_use]
    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn push_node(&mut self, op: Op) -> RuleId {
        let id = RuleId(self.nodes.len());
        self.nodes.push(RuleNode { op, next: None });
        id
    }

    pub(crate) fn node(&self, id: RuleId) -> &RuleNode {
        &self.nodes[id.0]
    }

    /// Walk the top-level sibling chain.
    pub(crate) fn top_level(&self) -> impl Iterator<Item = RuleId> + '_ {
        std::iter::successors(self.head, move |id| self.nodes[id.0].next)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({} rules, {} nodes, {} patterns)",
            self.len(),
            self.nodes.len(),
            self.patterns.len(),
        )
    }
}
