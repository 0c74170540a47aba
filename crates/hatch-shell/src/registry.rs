//! Command records, actions, and the trigger registry.
//!
//! The registry keeps every command in insertion order plus an exact-match
//! map from trigger to command. Registering a trigger twice replaces the
//! map entry while both records stay in the ordered list, so the older one
//! remains reachable through a case-insensitive scan.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hatch_types::error::{HatchError, Result};

/// Output produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// A block of text.
    Text(String),
    /// Individual output lines.
    Lines(Vec<String>),
    /// Action produced no visible output.
    None,
    /// Signal to the host to stop reading input.
    Exit,
    /// Signal to the host to list the registered commands.
    Help,
    /// Signal to the host to register `alias` for the command `target`.
    ///
    /// Actions only see their own record, so registry mutation is
    /// requested from the host instead of performed in place.
    Alias { target: String, alias: String },
}

type PlainFn = dyn Fn(&Command, &[String]) -> Result<CommandOutput> + Send + Sync;
type DashFn = dyn Fn(&Command, &[String], &[String]) -> Result<CommandOutput> + Send + Sync;

/// Behaviour bound to a command.
///
/// Cloning an action shares the underlying closure; aliases hold a clone of
/// the original's action.
#[derive(Clone)]
pub enum Action {
    /// Receives the command record and positional arguments.
    Plain(Arc<PlainFn>),
    /// Additionally receives the dash arguments.
    WithDashArgs(Arc<DashFn>),
}

impl Action {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&Command, &[String]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(f))
    }

    pub fn with_dash_args<F>(f: F) -> Self
    where
        F: Fn(&Command, &[String], &[String]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self::WithDashArgs(Arc::new(f))
    }

    /// Call the action.
    ///
    /// Plain actions ignore `dash_args`; dash-aware actions called without
    /// them receive an empty slice.
    pub fn invoke(
        &self,
        command: &Command,
        args: &[String],
        dash_args: Option<&[String]>,
    ) -> Result<CommandOutput> {
        match self {
            Self::Plain(f) => f(command, args),
            Self::WithDashArgs(f) => f(command, args, dash_args.unwrap_or(&[])),
        }
    }

    /// Whether both values share the same closure.
    pub fn ptr_eq(&self, other: &Action) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => Arc::ptr_eq(a, b),
            (Self::WithDashArgs(a), Self::WithDashArgs(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Action::Plain"),
            Self::WithDashArgs(_) => f.write_str("Action::WithDashArgs"),
        }
    }
}

/// One invocable command.
#[derive(Debug, Clone)]
pub struct Command {
    trigger: String,
    action: Action,
    is_alias: bool,
}

impl Command {
    /// The string that invokes this command.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Whether this record was created by [`CommandRegistry::add_alias`].
    pub fn is_alias(&self) -> bool {
        self.is_alias
    }

    /// Invoke the action with this record as its first argument.
    pub fn invoke(&self, args: &[String], dash_args: Option<&[String]>) -> Result<CommandOutput> {
        self.action.invoke(self, args, dash_args)
    }
}

/// Registry of commands keyed by trigger.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Every registered record, in insertion order.
    commands: Vec<Arc<Command>>,
    /// Exact-match index; the latest registration of a trigger wins.
    by_trigger: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under `trigger`.
    ///
    /// An existing trigger is shadowed for exact lookups; the earlier record
    /// stays in the ordered list. Only an empty trigger is rejected.
    pub fn register(&mut self, trigger: impl Into<String>, action: Action) -> Result<Arc<Command>> {
        self.insert(trigger.into(), action, false)
    }

    /// Like [`register`](Self::register), but refuses a trigger that is
    /// already reachable by exact lookup.
    pub fn register_unique(
        &mut self,
        trigger: impl Into<String>,
        action: Action,
    ) -> Result<Arc<Command>> {
        let trigger = trigger.into();
        if self.by_trigger.contains_key(&trigger) {
            return Err(HatchError::Command(format!("duplicate trigger: {trigger}")));
        }
        self.insert(trigger, action, false)
    }

    /// Register `alias` as a new record sharing `command`'s action.
    pub fn add_alias(&mut self, command: &Command, alias: impl Into<String>) -> Result<Arc<Command>> {
        let record = self.insert(alias.into(), command.action.clone(), true)?;
        log::debug!("Aliased {} -> {}", record.trigger, command.trigger);
        Ok(record)
    }

    /// Find a command by trigger.
    ///
    /// The exact-match index is checked first. When that misses and
    /// `case_sensitive` is false, the ordered list is scanned and the first
    /// record whose lower-cased trigger matches is returned.
    pub fn lookup(&self, trigger: &str, case_sensitive: bool) -> Option<Arc<Command>> {
        if let Some(cmd) = self.by_trigger.get(trigger) {
            return Some(Arc::clone(cmd));
        }
        if case_sensitive {
            return None;
        }
        let wanted = trigger.to_lowercase();
        self.commands
            .iter()
            .find(|cmd| cmd.trigger.to_lowercase() == wanted)
            .map(Arc::clone)
    }

    /// Whether `trigger` resolves by exact lookup.
    pub fn contains(&self, trigger: &str) -> bool {
        self.by_trigger.contains_key(trigger)
    }

    /// All records in insertion order, shadowed ones included.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    /// Triggers in insertion order.
    pub fn triggers(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.trigger()).collect()
    }

    /// Number of records, shadowed ones included.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn insert(&mut self, trigger: String, action: Action, is_alias: bool) -> Result<Arc<Command>> {
        if trigger.is_empty() {
            return Err(HatchError::Command("trigger cannot be empty".to_string()));
        }
        let record = Arc::new(Command {
            trigger,
            action,
            is_alias,
        });
        self.commands.push(Arc::clone(&record));
        if let Some(prev) = self
            .by_trigger
            .insert(record.trigger.clone(), Arc::clone(&record))
        {
            log::debug!("Trigger {} shadows an earlier registration", prev.trigger);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Action {
        Action::plain(|cmd, args| Ok(CommandOutput::Text(format!("{}:{}", cmd.trigger(), args.join(",")))))
    }

    fn constant(text: &'static str) -> Action {
        Action::plain(move |_, _| Ok(CommandOutput::Text(text.to_string())))
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = CommandRegistry::new();
        let cmd = reg.register("go", echo()).unwrap();
        assert_eq!(cmd.trigger(), "go");
        assert!(!cmd.is_alias());
        let found = reg.lookup("go", true).unwrap();
        assert!(Arc::ptr_eq(&cmd, &found));
    }

    #[test]
    fn empty_registry() {
        let reg = CommandRegistry::default();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
        assert!(reg.lookup("anything", false).is_none());
    }

    #[test]
    fn empty_trigger_rejected() {
        let mut reg = CommandRegistry::new();
        let err = reg.register("", echo()).unwrap_err();
        assert!(matches!(err, HatchError::Command(_)));
        assert!(reg.is_empty());
    }

    #[test]
    fn case_sensitive_lookup_does_not_scan() {
        let mut reg = CommandRegistry::new();
        reg.register("Go", echo()).unwrap();
        assert!(reg.lookup("go", true).is_none());
        assert!(reg.lookup("GO", true).is_none());
    }

    #[test]
    fn case_insensitive_returns_first_in_registration_order() {
        let mut reg = CommandRegistry::new();
        let upper = reg.register("Go", constant("upper")).unwrap();
        reg.register("go", constant("lower")).unwrap();
        let found = reg.lookup("GO", false).unwrap();
        assert!(Arc::ptr_eq(&upper, &found));
    }

    #[test]
    fn case_insensitive_prefers_exact_match() {
        let mut reg = CommandRegistry::new();
        reg.register("Go", constant("upper")).unwrap();
        let lower = reg.register("go", constant("lower")).unwrap();
        let found = reg.lookup("go", false).unwrap();
        assert!(Arc::ptr_eq(&lower, &found));
    }

    #[test]
    fn case_insensitive_miss() {
        let mut reg = CommandRegistry::new();
        reg.register("go", echo()).unwrap();
        assert!(reg.lookup("stop", false).is_none());
    }

    #[test]
    fn unicode_case_folding() {
        let mut reg = CommandRegistry::new();
        reg.register("Ärger", echo()).unwrap();
        assert!(reg.lookup("äRGER", false).is_some());
    }

    #[test]
    fn alias_shares_action() {
        let mut reg = CommandRegistry::new();
        let original = reg.register("list", echo()).unwrap();
        let alias = reg.add_alias(&original, "ls").unwrap();

        assert!(alias.is_alias());
        assert!(!original.is_alias());
        assert!(alias.action().ptr_eq(original.action()));

        let a = args(&["x", "y"]);
        let from_alias = alias.action().invoke(&original, &a, None).unwrap();
        let from_original = original.action().invoke(&original, &a, None).unwrap();
        assert_eq!(from_alias, from_original);
    }

    #[test]
    fn alias_receives_its_own_record() {
        let mut reg = CommandRegistry::new();
        let original = reg.register("list", echo()).unwrap();
        let alias = reg.add_alias(&original, "ls").unwrap();
        assert_eq!(
            alias.invoke(&args(&["a"]), None).unwrap(),
            CommandOutput::Text("ls:a".to_string())
        );
    }

    #[test]
    fn alias_of_alias_keeps_original_action() {
        let mut reg = CommandRegistry::new();
        let original = reg.register("list", echo()).unwrap();
        let first = reg.add_alias(&original, "ls").unwrap();
        let second = reg.add_alias(&first, "dir").unwrap();
        assert!(second.is_alias());
        assert!(second.action().ptr_eq(original.action()));
        assert_eq!(reg.triggers(), vec!["list", "ls", "dir"]);
    }

    #[test]
    fn reregistering_shadows_exact_lookup() {
        let mut reg = CommandRegistry::new();
        let old = reg.register("run", constant("old")).unwrap();
        let new = reg.register("run", constant("new")).unwrap();

        let exact = reg.lookup("run", true).unwrap();
        assert!(Arc::ptr_eq(&exact, &new));
        assert_eq!(reg.len(), 2);

        // The old record still exists and is reached first by a scan.
        assert!(reg.commands().any(|c| Arc::ptr_eq(c, &old)));
        assert_eq!(old.trigger().to_lowercase(), "run");
        let scanned = reg.lookup("RUN", false).unwrap();
        assert!(Arc::ptr_eq(&scanned, &old));
    }

    #[test]
    fn register_unique_rejects_duplicates() {
        let mut reg = CommandRegistry::new();
        reg.register_unique("run", echo()).unwrap();
        let err = reg.register_unique("run", echo()).unwrap_err();
        assert!(format!("{err}").contains("duplicate trigger: run"));
        assert_eq!(reg.len(), 1);
        // Differing case is a distinct trigger.
        reg.register_unique("Run", echo()).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn dash_aware_action_receives_dash_args() {
        let action = Action::with_dash_args(|_, args, dash| {
            Ok(CommandOutput::Lines(vec![args.join(" "), dash.join(" ")]))
        });
        let mut reg = CommandRegistry::new();
        let cmd = reg.register("grep", action).unwrap();
        let out = cmd.invoke(&args(&["pat"]), Some(args(&["-i"]).as_slice())).unwrap();
        assert_eq!(out, CommandOutput::Lines(args(&["pat", "-i"])));
        let out = cmd.invoke(&args(&["pat"]), None).unwrap();
        assert_eq!(out, CommandOutput::Lines(args(&["pat", ""])));
    }

    #[test]
    fn plain_action_ignores_dash_args() {
        let mut reg = CommandRegistry::new();
        let cmd = reg.register("echo", echo()).unwrap();
        let out = cmd.invoke(&args(&["a"]), Some(args(&["-n"]).as_slice())).unwrap();
        assert_eq!(out, CommandOutput::Text("echo:a".to_string()));
    }

    #[test]
    fn distinct_closures_are_not_ptr_eq() {
        assert!(!echo().ptr_eq(&echo()));
        let a = echo();
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn action_debug() {
        assert_eq!(format!("{:?}", echo()), "Action::Plain");
    }

    #[test]
    fn independent_registries() {
        let mut a = CommandRegistry::new();
        let b = CommandRegistry::new();
        a.register("only-a", echo()).unwrap();
        assert!(a.contains("only-a"));
        assert!(!b.contains("only-a"));
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandRegistry>();
    }
}
