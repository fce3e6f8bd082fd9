//! TextMate grammars.
//!
//! A grammar is a tree of rules loaded from JSON:
//!
//! - `match` rules scope a single regex match (with optional `captures`)
//! - `begin`/`end` rules open a region that can span lines; back
//!   references to the `begin` match are expanded into `end`
//! - `begin`/`while` rules open a region that continues on each following
//!   line for as long as the `while` pattern matches at its start
//! - `include` pulls in `#repository` entries, `$self` or `$base`
//!
//! ## Learning: Arenas Instead of Pointers
//!
//! Rules refer to each other (a string rule includes escape rules, a
//! repository entry may include itself). Rather than fight the borrow
//! checker with `Rc<RefCell<Rule>>`, every rule lives in one `Vec` and
//! rules point at each other by index. The rule stack carried between
//! lines is then just a list of indices, which is cheap to clone, hash
//! and compare.
//!
//! ## Patterns
//!
//! Grammars are written for Oniguruma. A few constructs are rewritten for
//! the `regex` crate (`\h`, `\G`, `\Z`); patterns that still do not
//! compile (look-around, back references) are skipped with a warning.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use regex::{Captures, Regex, RegexBuilder};
use serde::Deserialize;

use crate::tokenizer::{Frame, RuleStack, Token, Tokenizer};
use crate::{SyntaxError, SyntaxResult};

type RuleId = u32;

/// Matches nothing; used for `begin` rules that never end.
const NEVER: &str = r"[^\s\S]";

/// Upper bound on match steps per line.
const MAX_STEPS: usize = 4096;

// ==================== JSON Format ====================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    name: Option<String>,
    #[serde(rename = "match")]
    match_: Option<String>,
    begin: Option<String>,
    end: Option<String>,
    #[serde(rename = "while")]
    while_: Option<String>,
    content_name: Option<String>,
    #[serde(default)]
    captures: HashMap<String, RawRule>,
    #[serde(default)]
    begin_captures: HashMap<String, RawRule>,
    #[serde(default)]
    end_captures: HashMap<String, RawRule>,
    #[serde(default)]
    while_captures: HashMap<String, RawRule>,
    include: Option<String>,
    #[serde(default)]
    patterns: Vec<RawRule>,
    #[serde(default)]
    repository: HashMap<String, RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrammar {
    scope_name: Option<String>,
    #[serde(default)]
    file_types: Vec<String>,
    first_line_match: Option<String>,
    #[serde(default)]
    patterns: Vec<RawRule>,
    #[serde(default)]
    repository: HashMap<String, RawRule>,
}

// ==================== Compiled Rules ====================

#[derive(Debug)]
struct Pattern {
    regex: Regex,
    /// Only matches at the search position (`\G`)
    anchored: bool,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self, regex::Error> {
        let (translated, anchored) = translate(source);
        let regex = RegexBuilder::new(&translated).multi_line(true).build()?;
        Ok(Self { regex, anchored })
    }

    fn captures_at<'t>(&self, text: &'t str, pos: usize) -> Option<Captures<'t>> {
        let caps = self.regex.captures_at(text, pos)?;
        if self.anchored && span(&caps).0 != pos {
            return None;
        }
        Some(caps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseKind {
    End,
    While,
}

#[derive(Debug)]
enum Kind {
    Match {
        pattern: Option<Pattern>,
        captures: Vec<(usize, RuleId)>,
    },
    Begin {
        pattern: Option<Pattern>,
        close: String,
        close_kind: CloseKind,
        begin_captures: Vec<(usize, RuleId)>,
        close_captures: Vec<(usize, RuleId)>,
    },
    Include {
        target: String,
        repository: usize,
    },
    Group,
}

#[derive(Debug)]
struct Rule {
    name: Vec<String>,
    content_name: Vec<String>,
    kind: Kind,
    patterns: Vec<RuleId>,
}

#[derive(Debug)]
struct Repository {
    parent: Option<usize>,
    entries: HashMap<String, RuleId>,
}

/// A compiled TextMate grammar.
#[derive(Debug)]
pub struct Grammar {
    scope_name: String,
    file_types: Vec<String>,
    first_line: Option<Regex>,
    rules: Vec<Rule>,
    /// Flattened match candidates inside each rule
    candidates: Vec<Vec<RuleId>>,
    /// Compiled `end`/`while` patterns after back-reference expansion
    dynamic: Mutex<HashMap<Arc<str>, Option<Arc<Pattern>>>>,
}

impl Grammar {
    /// Parses and compiles a grammar from JSON text.
    pub fn from_json(json: &str) -> SyntaxResult<Self> {
        let raw: RawGrammar = serde_json::from_str(json)?;
        let scope_name = raw.scope_name.ok_or(SyntaxError::MissingScope)?;

        let mut builder = Builder::new(&scope_name);
        let root_repository = builder.repository(None, &raw.repository);
        let patterns = raw
            .patterns
            .iter()
            .map(|p| builder.add(p, root_repository))
            .collect();
        builder.rules[0].patterns = patterns;

        let candidates = (0..builder.rules.len())
            .map(|id| builder.flatten_rule(id as RuleId))
            .collect();

        let first_line = raw
            .first_line_match
            .as_deref()
            .and_then(|src| match Pattern::compile(src) {
                Ok(p) => Some(p.regex),
                Err(e) => {
                    tracing::warn!(scope = %scope_name, "skipping firstLineMatch: {e}");
                    None
                }
            });

        Ok(Self {
            scope_name,
            file_types: raw.file_types,
            first_line,
            rules: builder.rules,
            candidates,
            dynamic: Mutex::new(HashMap::new()),
        })
    }

    /// Loads a grammar file.
    pub fn load(path: &Path) -> SyntaxResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SyntaxError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// File extensions this grammar claims, without the dot.
    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    /// Returns true if the grammar's `firstLineMatch` accepts this line.
    pub fn matches_first_line(&self, line: &str) -> bool {
        self.first_line.as_ref().is_some_and(|r| r.is_match(line))
    }

    // ==================== Matching ====================

    fn pattern_of(&self, id: RuleId) -> Option<&Pattern> {
        match &self.rules[id as usize].kind {
            Kind::Match { pattern, .. } | Kind::Begin { pattern, .. } => pattern.as_ref(),
            _ => None,
        }
    }

    /// Finds the candidate rule inside `context` that matches first.
    fn best_candidate<'t>(
        &self,
        context: RuleId,
        text: &'t str,
        pos: usize,
    ) -> Option<(RuleId, Captures<'t>)> {
        let mut best: Option<(RuleId, Captures<'t>)> = None;
        for &id in &self.candidates[context as usize] {
            let Some(caps) = self.pattern_of(id).and_then(|p| p.captures_at(text, pos)) else {
                continue;
            };
            let start = span(&caps).0;
            if best.as_ref().is_none_or(|(_, b)| start < span(b).0) {
                best = Some((id, caps));
                if start == pos {
                    break;
                }
            }
        }
        best
    }

    fn dynamic(&self, source: &Arc<str>) -> Option<Arc<Pattern>> {
        let mut cache = match self.dynamic.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(source.clone())
            .or_insert_with(|| match Pattern::compile(source) {
                Ok(p) => Some(Arc::new(p)),
                Err(e) => {
                    tracing::warn!(scope = %self.scope_name, "skipping end pattern: {e}");
                    None
                }
            })
            .clone()
    }

    fn scope_of(&self, base: &[String], frames: &[Frame], with_content: bool) -> Vec<String> {
        let mut scopes = base.to_vec();
        for (i, frame) in frames.iter().enumerate() {
            let rule = &self.rules[frame.rule as usize];
            scopes.extend(rule.name.iter().cloned());
            if with_content || i + 1 < frames.len() {
                scopes.extend(rule.content_name.iter().cloned());
            }
        }
        scopes
    }

    /// Tokenizes `text` starting from `frames`, returning byte regions and
    /// the frames left open at the end.
    fn run(&self, text: &str, base: &[String], mut frames: Vec<Frame>) -> (Vec<Region>, Vec<Frame>) {
        let mut regions = Vec::new();
        let mut pos = 0;
        // (frame index, begin match start) for frames opened on this text
        let mut pushed: Vec<(usize, usize)> = Vec::new();

        // `while` regions continue only if their pattern matches here.
        for depth in 1..frames.len() {
            let frame = &frames[depth];
            let is_while = matches!(
                self.rules[frame.rule as usize].kind,
                Kind::Begin { close_kind: CloseKind::While, .. }
            );
            if !is_while {
                continue;
            }
            let found = frame
                .end
                .as_ref()
                .and_then(|src| self.dynamic(src))
                .and_then(|p| p.captures_at(text, pos))
                .filter(|caps| span(caps).0 == pos);
            match found {
                Some(caps) => {
                    let scope = self.scope_of(base, &frames[..=depth], false);
                    let captures = self.close_captures(frame.rule);
                    self.capture_regions(&caps, &scope, captures, &mut regions);
                    pos = span(&caps).1;
                }
                None => {
                    frames.truncate(depth);
                    break;
                }
            }
        }

        for _ in 0..MAX_STEPS {
            if pos >= text.len() {
                break;
            }
            let Some(top) = frames.last().cloned() else {
                break;
            };
            let scope = self.scope_of(base, &frames, true);

            let end_match = match &self.rules[top.rule as usize].kind {
                Kind::Begin { close_kind: CloseKind::End, .. } => top
                    .end
                    .as_ref()
                    .and_then(|src| self.dynamic(src))
                    .and_then(|p| p.captures_at(text, pos)),
                _ => None,
            };
            let candidate = self.best_candidate(top.rule, text, pos);

            let step = match (end_match, candidate) {
                (Some(end), Some((id, caps))) => {
                    if span(&end).0 <= span(&caps).0 {
                        Step::End(end)
                    } else {
                        Step::Rule(id, caps)
                    }
                }
                (Some(end), None) => Step::End(end),
                (None, Some((id, caps))) => Step::Rule(id, caps),
                (None, None) => break,
            };

            match step {
                Step::End(caps) => {
                    let (start, end) = span(&caps);
                    push_region(&mut regions, pos, start, &scope);
                    let outer = self.scope_of(base, &frames, false);
                    let captures = self.close_captures(top.rule);
                    self.capture_regions(&caps, &outer, captures, &mut regions);

                    let depth = frames.len() - 1;
                    frames.pop();
                    pos = end;
                    if pushed.last() == Some(&(depth, end)) {
                        // Opened and closed at one spot: step past it.
                        let next = next_char(text, pos);
                        push_region(&mut regions, pos, next, &scope);
                        pos = next;
                    }
                    pushed.retain(|&(d, _)| d < depth);
                }
                Step::Rule(id, caps) => {
                    let (start, end) = span(&caps);
                    push_region(&mut regions, pos, start, &scope);
                    let rule = &self.rules[id as usize];
                    let mut inner = scope.clone();
                    inner.extend(rule.name.iter().cloned());

                    match &rule.kind {
                        Kind::Match { captures, .. } => {
                            self.capture_regions(&caps, &inner, captures, &mut regions);
                            pos = end;
                            if start == end {
                                let next = next_char(text, pos);
                                push_region(&mut regions, pos, next, &scope);
                                pos = next;
                            }
                        }
                        Kind::Begin {
                            close,
                            begin_captures,
                            ..
                        } => {
                            let looping = start == end
                                && pushed
                                    .iter()
                                    .any(|&(d, p)| p == start && frames[d].rule == id);
                            if looping {
                                let next = next_char(text, pos);
                                push_region(&mut regions, pos, next, &scope);
                                pos = next;
                                continue;
                            }
                            self.capture_regions(&caps, &inner, begin_captures, &mut regions);
                            let expanded = expand_backrefs(close, &caps);
                            frames.push(Frame {
                                rule: id,
                                end: Some(expanded.into()),
                            });
                            pushed.push((frames.len() - 1, start));
                            pos = end;
                        }
                        Kind::Include { .. } | Kind::Group => {
                            pos = next_char(text, pos);
                        }
                    }
                }
            }
        }

        if pos < text.len() {
            let scope = self.scope_of(base, &frames, true);
            push_region(&mut regions, pos, text.len(), &scope);
        }
        (regions, frames)
    }

    fn close_captures(&self, id: RuleId) -> &[(usize, RuleId)] {
        match &self.rules[id as usize].kind {
            Kind::Begin { close_captures, .. } => close_captures,
            _ => &[],
        }
    }

    /// Scopes a match, splitting it by its capture groups.
    fn capture_regions(
        &self,
        caps: &Captures<'_>,
        scope: &[String],
        captures: &[(usize, RuleId)],
        out: &mut Vec<Region>,
    ) {
        let (start, end) = span(caps);
        let mut regions = vec![Region {
            start,
            end,
            scopes: scope.to_vec(),
        }];

        for &(group, rule_id) in captures {
            let Some(m) = caps.get(group) else {
                continue;
            };
            if m.start() == m.end() {
                continue;
            }
            let rule = &self.rules[rule_id as usize];
            let nested = !self.candidates[rule_id as usize].is_empty();

            regions = carve(regions, m.start(), m.end(), |inside| {
                if nested {
                    let enclosing = inside.first().map(|r| r.scopes.clone()).unwrap_or_default();
                    let frames = vec![Frame {
                        rule: rule_id,
                        end: None,
                    }];
                    let (inner, _) = self.run(m.as_str(), &enclosing, frames);
                    inner
                        .into_iter()
                        .map(|r| Region {
                            start: r.start + m.start(),
                            end: r.end + m.start(),
                            scopes: r.scopes,
                        })
                        .collect()
                } else {
                    inside
                        .iter()
                        .map(|r| {
                            let mut scopes = r.scopes.clone();
                            scopes.extend(rule.name.iter().cloned());
                            Region { scopes, ..*r }
                        })
                        .collect()
                }
            });
        }

        out.extend(regions.into_iter().filter(|r| r.start < r.end));
    }
}

impl Tokenizer for Grammar {
    fn scope_name(&self) -> &str {
        &self.scope_name
    }

    fn initial_state(&self) -> RuleStack {
        RuleStack::default()
    }

    fn tokenize_line(&self, line: &str, state: &RuleStack) -> (Vec<Token>, RuleStack) {
        let frames = state.frames();
        let valid = !frames.is_empty()
            && frames[0].rule == 0
            && frames.iter().all(|f| (f.rule as usize) < self.rules.len());
        let frames = if valid {
            frames.to_vec()
        } else {
            self.initial_state().frames().to_vec()
        };

        let text = format!("{line}\n");
        let (regions, frames) = self.run(&text, &[], frames);
        (to_tokens(line, &regions), RuleStack::new(frames))
    }
}

// ==================== Building ====================

struct Builder {
    rules: Vec<Rule>,
    repositories: Vec<Repository>,
    unresolved: HashSet<String>,
    scope_name: String,
}

impl Builder {
    fn new(scope_name: &str) -> Self {
        let root = Rule {
            name: vec![scope_name.to_string()],
            content_name: Vec::new(),
            kind: Kind::Group,
            patterns: Vec::new(),
        };
        Self {
            rules: vec![root],
            repositories: Vec::new(),
            unresolved: HashSet::new(),
            scope_name: scope_name.to_string(),
        }
    }

    fn repository(&mut self, parent: Option<usize>, raw: &HashMap<String, RawRule>) -> usize {
        let id = self.repositories.len();
        self.repositories.push(Repository {
            parent,
            entries: HashMap::new(),
        });
        for (key, rule) in raw {
            let rule_id = self.add(rule, id);
            self.repositories[id].entries.insert(key.clone(), rule_id);
        }
        id
    }

    fn add(&mut self, raw: &RawRule, repository: usize) -> RuleId {
        let repository = if raw.repository.is_empty() {
            repository
        } else {
            self.repository(Some(repository), &raw.repository)
        };

        let patterns = raw.patterns.iter().map(|p| self.add(p, repository)).collect();
        let mut captures = self.captures(&raw.captures, repository);

        let kind = if let Some(source) = &raw.match_ {
            Kind::Match {
                pattern: self.compile(source),
                captures,
            }
        } else if let Some(source) = &raw.begin {
            let (close, close_kind, close_raw) = match (&raw.end, &raw.while_) {
                (Some(end), _) => (end.clone(), CloseKind::End, &raw.end_captures),
                (None, Some(w)) => (w.clone(), CloseKind::While, &raw.while_captures),
                (None, None) => (NEVER.to_string(), CloseKind::End, &raw.end_captures),
            };
            let mut begin_captures = self.captures(&raw.begin_captures, repository);
            let mut close_captures = self.captures(close_raw, repository);
            // `captures` on a begin rule is shorthand for both sides.
            if !captures.is_empty() && begin_captures.is_empty() && close_captures.is_empty() {
                begin_captures = captures.clone();
                close_captures = std::mem::take(&mut captures);
            }
            Kind::Begin {
                pattern: self.compile(source),
                close,
                close_kind,
                begin_captures,
                close_captures,
            }
        } else if let Some(target) = &raw.include {
            Kind::Include {
                target: target.clone(),
                repository,
            }
        } else {
            Kind::Group
        };

        let id = self.rules.len() as RuleId;
        self.rules.push(Rule {
            name: split_scopes(raw.name.as_deref()),
            content_name: split_scopes(raw.content_name.as_deref()),
            kind,
            patterns,
        });
        id
    }

    fn captures(&mut self, raw: &HashMap<String, RawRule>, repository: usize) -> Vec<(usize, RuleId)> {
        let mut captures: Vec<(usize, RuleId)> = raw
            .iter()
            .filter_map(|(group, rule)| {
                let group = group.parse().ok()?;
                Some((group, self.add(rule, repository)))
            })
            .collect();
        captures.sort_unstable();
        captures
    }

    fn compile(&self, source: &str) -> Option<Pattern> {
        match Pattern::compile(source) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(scope = %self.scope_name, pattern = source, "skipping pattern: {e}");
                None
            }
        }
    }

    fn resolve(&mut self, target: &str, repository: usize) -> Option<RuleId> {
        if target == "$self" || target == "$base" {
            return Some(0);
        }
        if let Some(key) = target.strip_prefix('#') {
            let mut current = Some(repository);
            while let Some(id) = current {
                let repo = &self.repositories[id];
                if let Some(&rule) = repo.entries.get(key) {
                    return Some(rule);
                }
                current = repo.parent;
            }
        }
        if self.unresolved.insert(target.to_string()) {
            tracing::warn!(scope = %self.scope_name, "cannot resolve include {target:?}");
        }
        None
    }

    fn flatten_rule(&mut self, id: RuleId) -> Vec<RuleId> {
        let patterns = self.rules[id as usize].patterns.clone();
        let mut out = Vec::new();
        let mut active = HashSet::from([id]);
        self.flatten(&patterns, &mut out, &mut active);
        out
    }

    /// Expands includes and pattern groups into the list of rules that can
    /// actually match.
    fn flatten(&mut self, ids: &[RuleId], out: &mut Vec<RuleId>, active: &mut HashSet<RuleId>) {
        for &id in ids {
            let rule = &self.rules[id as usize];
            match &rule.kind {
                Kind::Include { target, repository } => {
                    let (target, repository) = (target.clone(), *repository);
                    let Some(resolved) = self.resolve(&target, repository) else {
                        continue;
                    };
                    if !active.insert(resolved) {
                        continue;
                    }
                    let patterns = match self.rules[resolved as usize].kind {
                        Kind::Group => self.rules[resolved as usize].patterns.clone(),
                        _ => vec![resolved],
                    };
                    self.flatten(&patterns, out, active);
                    active.remove(&resolved);
                }
                Kind::Group => {
                    if active.insert(id) {
                        let patterns = rule.patterns.clone();
                        self.flatten(&patterns, out, active);
                        active.remove(&id);
                    }
                }
                Kind::Match { pattern: Some(_), .. } | Kind::Begin { pattern: Some(_), .. } => {
                    out.push(id);
                }
                _ => {}
            }
        }
    }
}

// ==================== Helpers ====================

/// A scoped byte range of the text being tokenized.
#[derive(Debug, Clone)]
struct Region {
    start: usize,
    end: usize,
    scopes: Vec<String>,
}

enum Step<'t> {
    End(Captures<'t>),
    Rule(RuleId, Captures<'t>),
}

fn span(caps: &Captures<'_>) -> (usize, usize) {
    caps.get(0).map_or((0, 0), |m| (m.start(), m.end()))
}

fn next_char(text: &str, pos: usize) -> usize {
    pos + text[pos..].chars().next().map_or(1, char::len_utf8)
}

fn push_region(regions: &mut Vec<Region>, start: usize, end: usize, scopes: &[String]) {
    if start < end {
        regions.push(Region {
            start,
            end,
            scopes: scopes.to_vec(),
        });
    }
}

fn split_scopes(name: Option<&str>) -> Vec<String> {
    name.map(|n| n.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Replaces the part of `regions` covering `start..end` with `middle` of it.
fn carve(
    regions: Vec<Region>,
    start: usize,
    end: usize,
    middle: impl FnOnce(&[Region]) -> Vec<Region>,
) -> Vec<Region> {
    let mut before = Vec::new();
    let mut inside = Vec::new();
    let mut after = Vec::new();
    for r in regions {
        if r.end <= start {
            before.push(r);
        } else if r.start >= end {
            after.push(r);
        } else {
            if r.start < start {
                before.push(Region {
                    start: r.start,
                    end: start,
                    scopes: r.scopes.clone(),
                });
            }
            if r.end > end {
                after.push(Region {
                    start: end,
                    end: r.end,
                    scopes: r.scopes.clone(),
                });
            }
            inside.push(Region {
                start: r.start.max(start),
                end: r.end.min(end),
                scopes: r.scopes,
            });
        }
    }
    before.extend(middle(&inside));
    before.extend(after);
    before
}

/// Substitutes `\N` in an `end`/`while` pattern with the escaped text of
/// group N of the `begin` match.
fn expand_backrefs(source: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(d) if d.is_ascii_digit() => {
                let mut group = 0usize;
                while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
                    group = group * 10 + digit as usize;
                    chars.next();
                }
                out.push_str(&regex::escape(caps.get(group).map_or("", |m| m.as_str())));
            }
            Some(_) => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Rewrites Oniguruma-only syntax. Returns the pattern and whether it was
/// anchored with `\G`.
fn translate(source: &str) -> (String, bool) {
    let mut out = String::with_capacity(source.len());
    let mut anchored = false;
    let mut class_depth = 0usize;
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('G') => anchored = true,
                Some('h') if class_depth > 0 => out.push_str("0-9a-fA-F"),
                Some('h') => out.push_str("[0-9a-fA-F]"),
                Some('H') if class_depth == 0 => out.push_str("[^0-9a-fA-F]"),
                Some('Z') => out.push('$'),
                Some('e') => out.push_str(r"\x1B"),
                Some(p) if p.is_ascii_punctuation() => out.push_str(&regex::escape(&p.to_string())),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push_str(r"\\"),
            },
            '[' => {
                class_depth += 1;
                out.push(c);
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    (out, anchored)
}

/// Converts byte regions of `line + "\n"` into char-column tokens,
/// merging neighbours with equal scopes.
fn to_tokens(line: &str, regions: &[Region]) -> Vec<Token> {
    let mut char_of = vec![0usize; line.len() + 1];
    let mut count = 0;
    for (byte, c) in line.char_indices() {
        for slot in &mut char_of[byte..byte + c.len_utf8()] {
            *slot = count;
        }
        count += 1;
    }
    char_of[line.len()] = count;

    let mut tokens: Vec<Token> = Vec::new();
    for region in regions {
        let start = char_of[region.start.min(line.len())];
        let end = char_of[region.end.min(line.len())];
        if start >= end {
            continue;
        }
        match tokens.last_mut() {
            Some(last) if last.end == start && last.scopes == region.scopes => last.end = end,
            _ => tokens.push(Token::new(start, end, region.scopes.clone())),
        }
    }
    tokens
}
