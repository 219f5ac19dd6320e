use std::sync::Arc;

use log::{debug, trace, warn};

use crate::tree::DeviceTree;
use crate::types::{MatchClause, Op, Segment};
use crate::{ApplyReport, AttributeSet, CreationState, RuleId, RuleSet, Sexpr, Uevent};

/// Attribute derived from `DEVPATH` before any rule runs.
const DEV_BASE_PATH: &str = "DEV-BASE-PATH";

pub(crate) fn apply<T: DeviceTree>(rules: &RuleSet, event: &Uevent, tree: &mut T) -> ApplyReport {
    let mut attributes = event.attributes().clone();
    let base = attributes
        .get("DEVPATH")
        .map(|path| path.rsplit_once('/').map_or(path, |(_, base)| base).to_owned());
    if let Some(base) = base {
        attributes.insert(DEV_BASE_PATH, Sexpr::from(base));
    }

    let config = rules.config();
    let group = attributes.get("SUBSYSTEM").unwrap_or(config.default_group());
    let mut state = CreationState::new(
        Arc::from(config.default_user()),
        Arc::from(group),
        config.default_mode(),
    );
    state.major = device_number(&attributes, "MAJOR");
    state.minor = device_number(&attributes, "MINOR");

    if state.is_unaddressable() {
        debug!("{}: no device number, skipping rules", event.header());
        return ApplyReport::suppressed();
    }

    let mut eval = Evaluator {
        rules,
        attributes: &attributes,
        tree,
        state,
        report: ApplyReport::default(),
    };
    for id in rules.top_level() {
        let result = eval.node(id);
        eval.report.record_result(result);
    }
    debug!("{}: {}", event.header(), eval.report);
    eval.report
}

/// Strict decimal parse of a device number. Missing attributes are 0; so
/// are malformed ones, with a warning.
fn device_number(attributes: &AttributeSet, key: &str) -> u32 {
    let Some(text) = attributes.get(key) else {
        return 0;
    };
    let parsed = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    };
    parsed.unwrap_or_else(|| {
        warn!("ignoring malformed {key}={text:?}");
        0
    })
}

struct Evaluator<'a, T: DeviceTree> {
    rules: &'a RuleSet,
    attributes: &'a AttributeSet,
    tree: &'a mut T,
    state: CreationState,
    report: ApplyReport,
}

impl<T: DeviceTree> Evaluator<'_, T> {
    fn node(&mut self, id: RuleId) -> bool {
        let rules = self.rules;
        let result = match &rules.node(id).op {
            Op::Match(clauses) => self.matches(clauses),
            Op::When { condition, body } => self.node(*condition) && self.node(*body),
            Op::Mknod(segments) => self.mknod(segments),
            Op::SetUser(user) => {
                self.state.user = Arc::clone(user);
                true
            }
            Op::SetGroup(group) => {
                self.state.group = Arc::clone(group);
                true
            }
            Op::SetBlockDevice => {
                self.state.block_device = true;
                true
            }
            Op::SetMode(mode) => {
                self.state.mode = *mode;
                true
            }
        };
        trace!("node {} -> {result}", id.index());
        result
    }

    fn matches(&self, clauses: &[MatchClause]) -> bool {
        let patterns = self.rules.patterns();
        clauses.iter().all(|clause| {
            self.attributes
                .get(&clause.key)
                .is_some_and(|value| patterns.is_match(&clause.pattern, value))
        })
    }

    fn mknod(&mut self, segments: &[Segment]) -> bool {
        let attributes = self.attributes;
        let names: Vec<&str> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Attribute(name) => attributes.get(name).unwrap_or(name.as_ref()),
                Segment::Literal(text) => text.as_ref(),
            })
            .collect();
        let path = names.join("/");
        let Some((device, dirs)) = names.split_last() else {
            return false;
        };
        if names.iter().any(|name| name.is_empty()) {
            debug!("mknod {path:?}: empty path component");
            return false;
        }

        let mut dir = self.tree.root();
        for name in dirs {
            dir = match self.tree.get_child(dir, name) {
                Some(node) if self.tree.is_directory(node) => node,
                Some(_) => {
                    debug!("mknod {path}: {name} exists and is not a directory");
                    return false;
                }
                None => {
                    let node = self.tree.make_directory(dir, name);
                    let mode = self.tree.mode(node);
                    self.tree.set_mode(node, mode | 0o111);
                    trace!("created directory {name}");
                    node
                }
            };
        }

        let state = &self.state;
        let kind = state.kind();
        let node = match self.tree.get_child(dir, device) {
            Some(node) if self.tree.is_device(node) => {
                self.tree.set_major_minor(node, state.major, state.minor);
                self.tree.set_kind(node, kind);
                debug!("updated {kind} device {path} {},{}", state.major, state.minor);
                node
            }
            Some(_) => {
                debug!("mknod {path}: exists and is not a device");
                return false;
            }
            None => {
                let node = self
                    .tree
                    .make_device(dir, device, kind, state.major, state.minor);
                debug!("created {kind} device {path} {},{}", state.major, state.minor);
                node
            }
        };
        self.tree.set_owner(node, &state.user, &state.group);
        let mode = self.tree.mode(node);
        self.tree.set_mode(node, (mode & !0o7777) | state.mode);
        self.report.record_device(path);
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{DeviceTree, MemTree, S_IFDIR};
    use crate::{Config, DeviceKind, RuleSet, Uevent};

    fn tty(minor: &str) -> Uevent {
        Uevent::new("add@/devices/tty1")
            .set("SUBSYSTEM", "tty")
            .set("DEVPATH", "/devices/tty1")
            .set("MAJOR", "4")
            .set("MINOR", minor)
    }

    fn run(source: &str, event: &Uevent) -> MemTree {
        let rules = RuleSet::from_source(source).unwrap();
        let mut tree = MemTree::new();
        let _ = rules.apply(event, &mut tree);
        tree
    }

    #[test]
    fn mode_applies_only_after_set_mode() {
        let tree = run(r#"(set-mode 0640) (mknod "x")"#, &tty("1"));
        assert_eq!(tree.get("x").unwrap().permissions(), 0o640);

        let tree = run(r#"(mknod "x") (set-mode 0640)"#, &tty("1"));
        assert_eq!(tree.get("x").unwrap().permissions(), 0o660);
    }

    #[test]
    fn false_condition_has_no_side_effects() {
        let tree = run(
            r#"(when (match (SUBSYSTEM . "^block$")) (set-mode 0600))
               (when (match (SUBSYSTEM . "^block$")) (mknod "never"))
               (mknod "x")"#,
            &tty("1"),
        );
        assert!(tree.get("never").is_none());
        assert_eq!(tree.get("x").unwrap().permissions(), 0o660);
    }

    #[test]
    fn when_returns_body_result() {
        let rules = RuleSet::from_source(
            r#"(when (match (SUBSYSTEM . "^tty$")) (set-mode 0600))
               (when (match (SUBSYSTEM . "^net$")) (set-mode 0600))"#,
        )
        .unwrap();
        let report = rules.apply(&tty("1"), &mut MemTree::new());
        assert_eq!(report.results(), &[true, false]);
    }

    #[test]
    fn subsystem_sets_group_only() {
        let tree = run("(mknod DEV-BASE-PATH)", &tty("1"));
        let e = tree.get("tty1").unwrap();
        assert_eq!(e.user(), "root");
        assert_eq!(e.group(), "tty");
    }

    #[test]
    fn set_user_and_group_override() {
        let tree = run(
            r#"(set-user "uucp") (set-group "dialout") (mknod DEV-BASE-PATH)"#,
            &tty("1"),
        );
        let e = tree.get("tty1").unwrap();
        assert_eq!(e.user(), "uucp");
        assert_eq!(e.group(), "dialout");
    }

    #[test]
    fn config_defaults_without_subsystem() {
        let mut rules =
            RuleSet::with_config(Config::new().user("daemon").group("dev").mode(0o600));
        rules.load_str("(mknod DEV-BASE-PATH)").unwrap();
        let event = Uevent::new("add")
            .set("DEVPATH", "/devices/misc/fuse")
            .set("MAJOR", "10")
            .set("MINOR", "229");
        let mut tree = MemTree::new();
        let _ = rules.apply(&event, &mut tree);
        let e = tree.get("fuse").unwrap();
        assert_eq!((e.user(), e.group(), e.permissions()), ("daemon", "dev", 0o600));
    }

    #[test]
    fn path_resolution_creates_directories() {
        let event = Uevent::new("add@/devices/eth0")
            .set("SUBSYSTEM", "net")
            .set("DEVPATH", "/devices/eth0")
            .set("MAJOR", "10")
            .set("MINOR", "7");
        let tree = run("(mknod SUBSYSTEM DEV-BASE-PATH)", &event);
        let net = tree.get("net").unwrap();
        assert!(net.is_directory());
        assert_eq!(net.mode(), S_IFDIR | 0o755);
        assert_eq!(
            tree.get("net/eth0").unwrap().device(),
            Some((DeviceKind::Char, 10, 7))
        );
    }

    #[test]
    fn unknown_symbol_segment_is_literal() {
        let tree = run(r#"(mknod input "by-id" MISSING)"#, &tty("1"));
        assert!(tree.get("input/by-id/MISSING").is_some());
    }

    #[test]
    fn devpath_without_slash_is_whole_base() {
        let event = Uevent::new("add")
            .set("DEVPATH", "loop0")
            .set("MAJOR", "7")
            .set("MINOR", "0");
        let tree = run("(mknod DEV-BASE-PATH)", &event);
        assert!(tree.get("loop0").is_some());
    }

    #[test]
    fn zero_numbers_suppress_everything() {
        let rules = RuleSet::from_source(r#"(mknod "x")"#).unwrap();
        let mut tree = MemTree::new();
        let report = rules.apply(&tty("0").set("MAJOR", "0"), &mut tree);
        assert!(report.is_suppressed());
        assert!(tree.is_empty());

        let report = rules.apply(&Uevent::new("add"), &mut tree);
        assert!(report.is_suppressed());
        assert!(tree.is_empty());
    }

    #[test]
    fn malformed_numbers_are_zero() {
        let event = Uevent::new("add")
            .set("DEVPATH", "/x")
            .set("MAJOR", "4a")
            .set("MINOR", "+1");
        let rules = RuleSet::from_source("(mknod DEV-BASE-PATH)").unwrap();
        assert!(rules.apply(&event, &mut MemTree::new()).is_suppressed());

        let event = event.set("MINOR", "3");
        let tree = run("(mknod DEV-BASE-PATH)", &event);
        assert_eq!(tree.get("x").unwrap().device(), Some((DeviceKind::Char, 0, 3)));
    }

    #[test]
    fn directory_in_the_way_fails_node() {
        let rules = RuleSet::from_source(r#"(mknod "a" "b") (mknod "a")"#).unwrap();
        let mut tree = MemTree::new();
        let report = rules.apply(&tty("1"), &mut tree);
        assert_eq!(report.results(), &[true, false]);
        assert!(tree.get("a").unwrap().is_directory());
    }

    #[test]
    fn device_in_the_way_of_directory_fails_node() {
        let rules = RuleSet::from_source(r#"(mknod "a") (mknod "a" "b") (mknod "c")"#).unwrap();
        let mut tree = MemTree::new();
        let report = rules.apply(&tty("1"), &mut tree);
        assert_eq!(report.results(), &[true, false, true]);
        assert_eq!(report.devices(), &["a", "c"]);
    }

    #[test]
    fn existing_device_is_updated_in_place() {
        let rules = RuleSet::from_source("(mknod DEV-BASE-PATH)").unwrap();
        let mut tree = MemTree::new();
        let _ = rules.apply(&tty("1"), &mut tree);
        let before = tree.len();

        let rules = RuleSet::from_source(
            "(set-attribute block-device) (set-mode 0600) (mknod DEV-BASE-PATH)",
        )
        .unwrap();
        let _ = rules.apply(&tty("9"), &mut tree);
        assert_eq!(tree.len(), before);
        let e = tree.get("tty1").unwrap();
        assert_eq!(e.device(), Some((DeviceKind::Block, 4, 9)));
        assert_eq!(e.mode(), DeviceKind::Block.type_bits() | 0o600);
    }

    #[test]
    fn symlink_in_the_way_fails_node() {
        let rules = RuleSet::from_source(r#"(mknod "cdrom")"#).unwrap();
        let mut tree = MemTree::new();
        let root = tree.root();
        tree.make_symlink(root, "cdrom", "sr0");
        let report = rules.apply(&tty("1"), &mut tree);
        assert_eq!(report.results(), &[false]);
    }

    #[test]
    fn empty_component_fails_node() {
        let event = tty("1").set("DEVPATH", "/devices/");
        let rules = RuleSet::from_source("(mknod DEV-BASE-PATH)").unwrap();
        let mut tree = MemTree::new();
        let report = rules.apply(&event, &mut tree);
        assert_eq!(report.results(), &[false]);
        assert!(tree.is_empty());
    }

    #[test]
    fn empty_match_is_true() {
        let rules = RuleSet::from_source("(when (match) (mknod \"x\"))").unwrap();
        let report = rules.apply(&tty("1"), &mut MemTree::new());
        assert_eq!(report.results(), &[true]);
    }

    #[test]
    fn match_requires_every_clause() {
        let rules = RuleSet::from_source(
            r#"(match (SUBSYSTEM . "^tty$") (DEVPATH . "tty1$"))
               (match (SUBSYSTEM . "^tty$") (DEVPATH . "tty2$"))
               (match (SUBSYSTEM . "^tty$") (NOPE . ".*"))"#,
        )
        .unwrap();
        let report = rules.apply(&tty("1"), &mut MemTree::new());
        assert_eq!(report.results(), &[true, false, false]);
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let rules = RuleSet::from_source(r#"(match (SUBSYSTEM . "(tty"))"#).unwrap();
        let report = rules.apply(&tty("1"), &mut MemTree::new());
        assert_eq!(report.results(), &[false]);
    }

    #[test]
    fn later_duplicate_attribute_wins() {
        let event = tty("1").set("SUBSYSTEM", "input");
        let rules = RuleSet::from_source(r#"(match (SUBSYSTEM . "^input$"))"#).unwrap();
        let report = rules.apply(&event, &mut MemTree::new());
        assert_eq!(report.results(), &[true]);
    }

    #[test]
    fn derived_base_path_is_matchable() {
        let rules = RuleSet::from_source(r#"(match (DEV-BASE-PATH . "^tty1$"))"#).unwrap();
        let report = rules.apply(&tty("1"), &mut MemTree::new());
        assert_eq!(report.results(), &[true]);
    }

    #[test]
    fn event_is_not_modified() {
        let event = tty("1");
        let rules = RuleSet::from_source("(mknod DEV-BASE-PATH)").unwrap();
        let _ = rules.apply(&event, &mut MemTree::new());
        assert!(!event.attributes().lookup("DEV-BASE-PATH").is_found());
    }
}
