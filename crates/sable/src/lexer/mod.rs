//! # Lexer Runtime
//!
//! Mode-aware longest-match tokenization.
//!
//! ## Overview
//!
//! A lexer is described as a list of [`LexerAction`]s: each names the modes
//! it is valid in, a pattern, an optional emitted terminal (none makes it a
//! skip rule), and an optional mode transition (`enter`/`leave`/`swap`).
//! Two generators build runnable lexers from actions:
//!
//! - [`RegexLexerGenerator`]: full regex patterns, compiled per mode into one
//!   DFA by unioning rule NFAs under a shared start
//! - [`CharLexerGenerator`]: degenerate single-character patterns (the empty
//!   pattern is a match-any fallback), enough to bootstrap the regex
//!   language's own tokenizer
//!
//! ## Tokenization
//!
//! The stream keeps a mark at the last confirmed token boundary and scans
//! char-by-char through the active mode's DFA simulator. Entering an
//! accepting state only records a pending match; a longer one may follow.
//! On a dead state the reader rewinds to the mark, the pending match is
//! emitted (or discarded for skip rules), the mode transition applies, and
//! scanning resumes just past the match. Input that can never match produces
//! one `UNRECOGNIZED` token per character, and every stream ends with exactly
//! one `EOF` token; lexing itself never fails.

mod input;

pub use input::CharReader;

use std::fmt;

use compact_str::{CompactString, ToCompactString};
use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::automata::{DfaSimulator, FiniteAutomaton, NfaBuilder, SimulationStatus};
use crate::intern::{Context, SymbolType};
use crate::regex;
use crate::symbol::Symbol;

/// The mode every lexer starts in.
pub const DEFAULT_MODE: &str = "default";

/// A mode-stack transition applied after an action's token is matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModeChange {
    /// Stay in the current mode.
    None,
    /// Push the named mode.
    Enter(CompactString),
    /// Pop back to the previous mode. Popping the last mode is a no-op.
    Leave,
    /// Replace the current mode with the named mode.
    Swap(CompactString),
}

/// One tokenization rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexerAction {
    modes: Vec<CompactString>,
    pattern: String,
    symbol_type: Option<SymbolType>,
    change: ModeChange,
}

impl LexerAction {
    /// A rule valid in the default mode emitting `ty`.
    #[must_use]
    pub fn token(pattern: impl Into<String>, ty: SymbolType) -> Self {
        Self::new(&[DEFAULT_MODE], pattern, Some(ty), ModeChange::None)
    }

    /// A rule valid in `modes` emitting `ty`.
    #[must_use]
    pub fn token_in(modes: &[&str], pattern: impl Into<String>, ty: SymbolType) -> Self {
        Self::new(modes, pattern, Some(ty), ModeChange::None)
    }

    /// A rule whose match is discarded.
    #[must_use]
    pub fn skip(modes: &[&str], pattern: impl Into<String>) -> Self {
        Self::new(modes, pattern, None, ModeChange::None)
    }

    /// A rule that pushes `target` after matching.
    #[must_use]
    pub fn enter(
        modes: &[&str],
        pattern: impl Into<String>,
        ty: Option<SymbolType>,
        target: &str,
    ) -> Self {
        Self::new(
            modes,
            pattern,
            ty,
            ModeChange::Enter(CompactString::from(target)),
        )
    }

    /// A rule that pops the current mode after matching.
    #[must_use]
    pub fn leave(modes: &[&str], pattern: impl Into<String>, ty: Option<SymbolType>) -> Self {
        Self::new(modes, pattern, ty, ModeChange::Leave)
    }

    /// A rule that replaces the current mode with `target` after matching.
    #[must_use]
    pub fn swap(
        modes: &[&str],
        pattern: impl Into<String>,
        ty: Option<SymbolType>,
        target: &str,
    ) -> Self {
        Self::new(
            modes,
            pattern,
            ty,
            ModeChange::Swap(CompactString::from(target)),
        )
    }

    fn new(
        modes: &[&str],
        pattern: impl Into<String>,
        ty: Option<SymbolType>,
        change: ModeChange,
    ) -> Self {
        assert!(!modes.is_empty(), "a lexer action needs at least one mode");
        if let Some(ty) = ty {
            assert!(ty.is_terminal(), "lexer actions emit terminals, got {ty}");
        }
        Self {
            modes: modes.iter().map(|&m| CompactString::from(m)).collect(),
            pattern: pattern.into(),
            symbol_type: ty,
            change,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn symbol_type(&self) -> Option<SymbolType> {
        self.symbol_type
    }

    #[must_use]
    pub fn modes(&self) -> &[CompactString] {
        &self.modes
    }

    #[must_use]
    pub fn change(&self) -> &ModeChange {
        &self.change
    }
}

impl fmt::Display for LexerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol_type {
            Some(ty) => write!(f, "{:?} -> {ty}", self.pattern),
            None => write!(f, "{:?} -> <skip>", self.pattern),
        }
    }
}

/// A generation-time problem with a lexer description.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum LexerBuildError {
    #[error("pattern {pattern:?} does not parse as a regex")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::lexer::bad_pattern)))]
    InvalidPattern { pattern: String },

    #[error("action {action} targets unknown mode {target:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::lexer::unknown_mode)))]
    UnknownMode { action: String, target: String },

    #[error("no action is valid in the {DEFAULT_MODE:?} mode")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::lexer::no_default_mode)))]
    MissingDefaultMode,
}

/// The outcome of lexer generation; a lexer is present iff `errors` is empty.
pub struct LexerBuildResult {
    pub errors: Vec<LexerBuildError>,
    pub warnings: Vec<String>,
    lexer: Option<Box<dyn Lexer>>,
}

impl LexerBuildResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn lexer(&self) -> Option<&dyn Lexer> {
        self.lexer.as_deref()
    }

    #[must_use]
    pub fn into_lexer(self) -> Option<Box<dyn Lexer>> {
        self.lexer
    }
}

/// A runnable tokenizer.
pub trait Lexer: Send + Sync {
    /// Lazily tokenizes a character source. The stream is finite,
    /// non-restartable, and ends with exactly one `EOF` symbol.
    fn lex_chars<'s>(
        &'s self,
        source: Box<dyn Iterator<Item = char> + 's>,
    ) -> Box<dyn Iterator<Item = Symbol> + 's>;

    /// Convenience over [`Lexer::lex_chars`] for in-memory text.
    fn lex<'s>(&'s self, text: &'s str) -> Box<dyn Iterator<Item = Symbol> + 's> {
        self.lex_chars(Box::new(text.chars()))
    }
}

/// Builds a lexer description from actions.
pub trait LexerGenerator {
    /// `context` supplies the `EOF`/`UNRECOGNIZED` terminals every stream
    /// emits.
    fn generate(&self, context: &Context, actions: &[LexerAction]) -> LexerBuildResult;
}

/// Groups actions by mode, panicking on a duplicate (mode, pattern) pair;
/// two rules with identical triggers in one mode is an author error.
fn group_by_mode(actions: &[LexerAction]) -> HashMap<CompactString, Vec<LexerAction>> {
    let mut groups: HashMap<CompactString, Vec<LexerAction>> = HashMap::new();
    let mut seen: HashSet<(CompactString, String)> = HashSet::new();
    for action in actions {
        for mode in action.modes() {
            assert!(
                seen.insert((mode.clone(), action.pattern().to_owned())),
                "duplicate pattern {:?} in mode {mode:?}",
                action.pattern(),
            );
            groups.entry(mode.clone()).or_default().push(action.clone());
        }
    }
    groups
}

/// Mode-structure checks shared by both generators.
fn validate_modes(
    actions: &[LexerAction],
    groups: &HashMap<CompactString, Vec<LexerAction>>,
    errors: &mut Vec<LexerBuildError>,
) {
    if !groups.contains_key(DEFAULT_MODE) {
        errors.push(LexerBuildError::MissingDefaultMode);
    }
    for action in actions {
        let target = match action.change() {
            ModeChange::Enter(target) | ModeChange::Swap(target) => target,
            ModeChange::None | ModeChange::Leave => continue,
        };
        if !groups.contains_key(target) {
            errors.push(LexerBuildError::UnknownMode {
                action: action.to_string(),
                target: target.to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// regex-pattern lexers

/// Generates DFA-driven lexers from regex-patterned actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexLexerGenerator;

impl LexerGenerator for RegexLexerGenerator {
    fn generate(&self, context: &Context, actions: &[LexerAction]) -> LexerBuildResult {
        let mut errors = Vec::new();
        let groups = group_by_mode(actions);
        validate_modes(actions, &groups, &mut errors);

        let mut automata = HashMap::new();
        for (mode, mode_actions) in &groups {
            let mut builder: NfaBuilder<LexerAction> = NfaBuilder::new();
            let shared_start = builder.add_state();
            for action in mode_actions {
                match regex::compile(&mut builder, action.clone(), action.pattern()) {
                    Ok(rule_start) => builder.add_epsilon(shared_start, rule_start),
                    Err(_) => errors.push(LexerBuildError::InvalidPattern {
                        pattern: action.pattern().to_owned(),
                    }),
                }
            }
            // declaration order doubles as match precedence on ties
            automata.insert(mode.clone(), builder.build().to_dfa(actions));
        }

        let lexer: Option<Box<dyn Lexer>> = errors.is_empty().then(|| {
            Box::new(DfaLexer {
                automata,
                eof: context.eof_type(),
                unrecognized: context.unrecognized_type(),
            }) as Box<dyn Lexer>
        });
        LexerBuildResult {
            errors,
            warnings: Vec::new(),
            lexer,
        }
    }
}

/// A generated lexer: one DFA per mode.
pub struct DfaLexer {
    automata: HashMap<CompactString, FiniteAutomaton<LexerAction>>,
    eof: SymbolType,
    unrecognized: SymbolType,
}

impl Lexer for DfaLexer {
    fn lex_chars<'s>(
        &'s self,
        source: Box<dyn Iterator<Item = char> + 's>,
    ) -> Box<dyn Iterator<Item = Symbol> + 's> {
        let default = self
            .automata
            .get(DEFAULT_MODE)
            .expect("generation validated the default mode");
        Box::new(DfaTokens {
            lexer: self,
            reader: CharReader::new(source),
            simulators: vec![DfaSimulator::new(default)],
            pending: None,
            done: false,
        })
    }
}

struct DfaTokens<'l, I> {
    lexer: &'l DfaLexer,
    reader: CharReader<I>,
    /// One simulator per entry of the mode stack; the top is active.
    simulators: Vec<DfaSimulator<'l, LexerAction>>,
    /// Longest accepted match so far: (action, chars past the mark).
    pending: Option<(LexerAction, usize)>,
    done: bool,
}

impl<'l, I: Iterator<Item = char>> DfaTokens<'l, I> {
    /// Rewinds to the mark, re-reads and emits the pending match (`None` for
    /// a skip rule), applies its mode change, and re-marks past it.
    fn emit_match(&mut self) -> Option<Symbol> {
        self.reader.rewind();
        let Some((action, length)) = self.pending.take() else {
            // nothing ever matched: one unrecognized token per character
            let c = self.reader.read()?;
            let (line, column) = self.reader.position();
            self.reader.mark();
            self.reset_simulators();
            return Some(Symbol::leaf(
                self.lexer.unrecognized,
                c.to_compact_string(),
                line,
                column,
            ));
        };

        let mut text = CompactString::default();
        let mut position = None;
        for _ in 0..length {
            match self.reader.read() {
                Some(c) => {
                    text.push(c);
                    position.get_or_insert_with(|| self.reader.position());
                }
                None => break,
            }
        }
        let (line, column) = position.unwrap_or_else(|| self.reader.position());
        self.reader.mark();

        match action.change() {
            ModeChange::None => {}
            ModeChange::Enter(target) => {
                let automaton = self
                    .lexer
                    .automata
                    .get(target)
                    .expect("generation validated mode targets");
                self.simulators.push(DfaSimulator::new(automaton));
            }
            ModeChange::Leave => {
                if self.simulators.len() > 1 {
                    self.simulators.pop();
                }
            }
            ModeChange::Swap(target) => {
                let automaton = self
                    .lexer
                    .automata
                    .get(target)
                    .expect("generation validated mode targets");
                self.simulators.pop();
                self.simulators.push(DfaSimulator::new(automaton));
            }
        }
        self.reset_simulators();

        action
            .symbol_type()
            .map(|ty| Symbol::leaf(ty, text, line, column))
    }

    fn reset_simulators(&mut self) {
        for simulator in &mut self.simulators {
            simulator.reset();
        }
    }

    fn active(&mut self) -> &mut DfaSimulator<'l, LexerAction> {
        self.simulators
            .last_mut()
            .expect("the mode stack is never empty")
    }
}

impl<I: Iterator<Item = char>> Iterator for DfaTokens<'_, I> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        loop {
            if self.done {
                return None;
            }
            match self.reader.read() {
                Some(c) => match self.active().consume(c) {
                    SimulationStatus::Accept => {
                        let action = self
                            .active()
                            .current_value()
                            .cloned()
                            .expect("accepting state carries its action");
                        let length = self.reader.offset_from_mark();
                        self.pending = Some((action, length));
                    }
                    SimulationStatus::Reject => {}
                    SimulationStatus::Error => {
                        if let Some(token) = self.emit_match() {
                            return Some(token);
                        }
                    }
                },
                None => {
                    let had_pending = self.pending.is_some();
                    match self.emit_match() {
                        Some(token) => return Some(token),
                        // a skip rule matched; rescan whatever follows it
                        None if had_pending => {}
                        None => {
                            self.done = true;
                            let (line, column) = self.reader.position();
                            return Some(Symbol::leaf(self.lexer.eof, "", line, column));
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// single-character lexers

/// Generates lexers whose patterns are single characters (or the empty
/// pattern, a match-any fallback). This is the bootstrap tokenizer the regex
/// language itself is lexed with, so it cannot depend on regex compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharLexerGenerator;

impl LexerGenerator for CharLexerGenerator {
    /// # Panics
    ///
    /// Panics if a pattern is longer than one character.
    fn generate(&self, context: &Context, actions: &[LexerAction]) -> LexerBuildResult {
        let mut errors = Vec::new();
        let groups = group_by_mode(actions);
        validate_modes(actions, &groups, &mut errors);

        let mut modes: HashMap<CompactString, HashMap<Option<char>, LexerAction>> = HashMap::new();
        for (mode, mode_actions) in groups {
            let mut table = HashMap::new();
            for action in mode_actions {
                let mut chars = action.pattern().chars();
                let key = chars.next();
                assert!(
                    chars.next().is_none(),
                    "char-lexer patterns are at most one character: {:?}",
                    action.pattern(),
                );
                table.insert(key, action);
            }
            modes.insert(mode, table);
        }

        let lexer: Option<Box<dyn Lexer>> = errors.is_empty().then(|| {
            Box::new(CharLexer {
                modes,
                eof: context.eof_type(),
                unrecognized: context.unrecognized_type(),
            }) as Box<dyn Lexer>
        });
        LexerBuildResult {
            errors,
            warnings: Vec::new(),
            lexer,
        }
    }
}

/// A generated single-character lexer.
pub struct CharLexer {
    modes: HashMap<CompactString, HashMap<Option<char>, LexerAction>>,
    eof: SymbolType,
    unrecognized: SymbolType,
}

impl Lexer for CharLexer {
    fn lex_chars<'s>(
        &'s self,
        source: Box<dyn Iterator<Item = char> + 's>,
    ) -> Box<dyn Iterator<Item = Symbol> + 's> {
        Box::new(CharTokens {
            lexer: self,
            source,
            mode_stack: vec![CompactString::from(DEFAULT_MODE)],
            line: 1,
            column: 1,
            done: false,
        })
    }
}

struct CharTokens<'l, I> {
    lexer: &'l CharLexer,
    source: I,
    mode_stack: Vec<CompactString>,
    line: u32,
    column: u32,
    done: bool,
}

impl<I: Iterator<Item = char>> Iterator for CharTokens<'_, I> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        loop {
            if self.done {
                return None;
            }
            let Some(c) = self.source.next() else {
                self.done = true;
                return Some(Symbol::leaf(self.lexer.eof, "", self.line, self.column));
            };
            let (line, column) = (self.line, self.column);
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }

            let mode = self
                .mode_stack
                .last()
                .expect("the mode stack is never empty");
            let table = self
                .lexer
                .modes
                .get(mode)
                .expect("generation validated mode targets");
            let action = table.get(&Some(c)).or_else(|| table.get(&None));

            let Some(action) = action.cloned() else {
                return Some(Symbol::leaf(
                    self.lexer.unrecognized,
                    c.to_compact_string(),
                    line,
                    column,
                ));
            };
            match action.change() {
                ModeChange::None => {}
                ModeChange::Enter(target) => self.mode_stack.push(target.clone()),
                ModeChange::Leave => {
                    if self.mode_stack.len() > 1 {
                        self.mode_stack.pop();
                    }
                }
                ModeChange::Swap(target) => {
                    self.mode_stack.pop();
                    self.mode_stack.push(target.clone());
                }
            }
            if let Some(ty) = action.symbol_type() {
                return Some(Symbol::leaf(ty, c.to_compact_string(), line, column));
            }
        }
    }
}
