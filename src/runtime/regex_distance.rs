//! Distance from a string to the language of a regular expression.
//!
//! The pattern is compiled to a Thompson automaton over char ranges and the
//! input is aligned against it with unit insertion and deletion costs and a
//! squashed character gap as substitution cost. Look-around assertions are
//! free moves in the automaton, so its cost is only a lower bound: whether the
//! distance is zero is always decided by a full match with `regex`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex_syntax::hir::{Class, Hir, HirKind};
use regex_syntax::Parser;

use super::squash;

/// Largest repetition count unrolled into the automaton.
const MAX_REPEAT: u32 = 100;
/// Largest automaton built before falling back to a plain match check.
const MAX_STATES: usize = 20_000;
/// Compiled patterns kept before the cache is dropped and refilled.
const MAX_CACHED: usize = 256;
/// Cost of a string the automaton aligns for free but the pattern rejects,
/// equal to the cheapest substitution.
const MIN_MISS: f64 = 0.5;

static AUTOMATA: Lazy<Mutex<HashMap<String, Arc<Compiled>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
struct Compiled {
    full_match: regex::Regex,
    nfa: Option<Nfa>,
}

#[derive(Debug)]
struct Unsupported;

#[derive(Debug, Default)]
struct State {
    epsilon: Vec<usize>,
    edges: Vec<(Arc<[(u32, u32)]>, usize)>,
}

#[derive(Debug, Default)]
struct Nfa {
    states: Vec<State>,
    start: usize,
    accept: usize,
}

impl Nfa {
    fn build(hir: &Hir) -> Result<Nfa, Unsupported> {
        let mut nfa = Nfa::default();
        let (start, accept) = nfa.compile(hir)?;
        nfa.start = start;
        nfa.accept = accept;
        Ok(nfa)
    }

    fn add_state(&mut self) -> Result<usize, Unsupported> {
        if self.states.len() >= MAX_STATES {
            return Err(Unsupported);
        }
        self.states.push(State::default());
        Ok(self.states.len() - 1)
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.states[from].epsilon.push(to);
    }

    fn edge(&mut self, from: usize, ranges: Arc<[(u32, u32)]>, to: usize) {
        self.states[from].edges.push((ranges, to));
    }

    fn compile(&mut self, hir: &Hir) -> Result<(usize, usize), Unsupported> {
        match hir.kind() {
            HirKind::Empty | HirKind::Look(_) => {
                let s = self.add_state()?;
                Ok((s, s))
            }
            HirKind::Literal(lit) => {
                let text = std::str::from_utf8(&lit.0).map_err(|_| Unsupported)?;
                let start = self.add_state()?;
                let mut current = start;
                for c in text.chars() {
                    let next = self.add_state()?;
                    self.edge(current, Arc::from(vec![(c as u32, c as u32)]), next);
                    current = next;
                }
                Ok((start, current))
            }
            HirKind::Class(class) => {
                let ranges: Vec<(u32, u32)> = match class {
                    Class::Unicode(cls) => cls
                        .ranges()
                        .iter()
                        .map(|r| (r.start() as u32, r.end() as u32))
                        .collect(),
                    Class::Bytes(cls) => cls
                        .ranges()
                        .iter()
                        .map(|r| (r.start() as u32, r.end() as u32))
                        .collect(),
                };
                let start = self.add_state()?;
                let end = self.add_state()?;
                self.edge(start, Arc::from(ranges), end);
                Ok((start, end))
            }
            HirKind::Capture(capture) => self.compile(&capture.sub),
            HirKind::Concat(parts) => {
                let start = self.add_state()?;
                let mut current = start;
                for part in parts {
                    let (s, e) = self.compile(part)?;
                    self.epsilon(current, s);
                    current = e;
                }
                Ok((start, current))
            }
            HirKind::Alternation(branches) => {
                let start = self.add_state()?;
                let end = self.add_state()?;
                for branch in branches {
                    let (s, e) = self.compile(branch)?;
                    self.epsilon(start, s);
                    self.epsilon(e, end);
                }
                Ok((start, end))
            }
            HirKind::Repetition(rep) => {
                if rep.min > MAX_REPEAT {
                    return Err(Unsupported);
                }
                let start = self.add_state()?;
                let mut current = start;
                for _ in 0..rep.min {
                    let (s, e) = self.compile(&rep.sub)?;
                    self.epsilon(current, s);
                    current = e;
                }
                match rep.max {
                    None => {
                        let hub = self.add_state()?;
                        let (s, e) = self.compile(&rep.sub)?;
                        self.epsilon(current, hub);
                        self.epsilon(hub, s);
                        self.epsilon(e, hub);
                        Ok((start, hub))
                    }
                    Some(max) => {
                        let optional = max.saturating_sub(rep.min);
                        if optional > MAX_REPEAT {
                            return Err(Unsupported);
                        }
                        let end = self.add_state()?;
                        for _ in 0..optional {
                            let (s, e) = self.compile(&rep.sub)?;
                            self.epsilon(current, s);
                            self.epsilon(current, end);
                            current = e;
                        }
                        self.epsilon(current, end);
                        Ok((start, end))
                    }
                }
            }
        }
    }

    /// Relaxes epsilon moves (free) and insertions (cost 1) within one row.
    fn close(&self, row: &mut [f64]) {
        let mut queue: VecDeque<usize> = (0..row.len()).filter(|&s| row[s].is_finite()).collect();
        let mut queued = vec![false; row.len()];
        for &s in &queue {
            queued[s] = true;
        }
        while let Some(s) = queue.pop_front() {
            queued[s] = false;
            let base = row[s];
            let state = &self.states[s];
            let moves = state
                .epsilon
                .iter()
                .map(|&t| (t, base))
                .chain(state.edges.iter().map(|(_, t)| (*t, base + 1.0)));
            for (t, cost) in moves {
                if cost < row[t] {
                    row[t] = cost;
                    if !queued[t] {
                        queued[t] = true;
                        queue.push_back(t);
                    }
                }
            }
        }
    }

    fn distance(&self, input: &str) -> f64 {
        let mut row = vec![f64::INFINITY; self.states.len()];
        row[self.start] = 0.0;
        self.close(&mut row);
        for c in input.chars() {
            let c = c as u32;
            let mut next = vec![f64::INFINITY; self.states.len()];
            for (s, &cost) in row.iter().enumerate() {
                if !cost.is_finite() {
                    continue;
                }
                // delete the input char
                if cost + 1.0 < next[s] {
                    next[s] = cost + 1.0;
                }
                for (ranges, t) in &self.states[s].edges {
                    let step = cost + squash(char_gap(c, ranges));
                    if step < next[*t] {
                        next[*t] = step;
                    }
                }
            }
            self.close(&mut next);
            row = next;
        }
        row[self.accept]
    }
}

fn char_gap(c: u32, ranges: &[(u32, u32)]) -> f64 {
    ranges
        .iter()
        .map(|&(lo, hi)| {
            if c < lo {
                lo - c
            } else if c > hi {
                c - hi
            } else {
                0
            }
        })
        .min()
        .map_or(f64::INFINITY, f64::from)
}

fn compiled(pattern: &str) -> Option<Arc<Compiled>> {
    let mut cache = match AUTOMATA.lock() {
        Ok(cache) => cache,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(entry) = cache.get(pattern) {
        return Some(entry.clone());
    }
    let full_match = match regex::Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re,
        Err(e) => {
            warn!("cannot compile pattern {pattern:?}: {e}");
            return None;
        }
    };
    let nfa = match Parser::new().parse(pattern).map(|hir| Nfa::build(&hir)) {
        Ok(Ok(nfa)) => Some(nfa),
        Ok(Err(Unsupported)) => {
            debug!("pattern {pattern:?} too large for distance automaton");
            None
        }
        Err(e) => {
            debug!("no distance automaton for {pattern:?}: {e}");
            None
        }
    };
    if cache.len() >= MAX_CACHED {
        cache.clear();
    }
    let entry = Arc::new(Compiled { full_match, nfa });
    cache.insert(pattern.to_string(), entry.clone());
    Some(entry)
}

/// Minimal edit cost turning `value` into some string matched in full by
/// `pattern`. Zero exactly when the pattern matches.
///
/// Without an automaton the result is 0 on a match and 1 otherwise. A pattern
/// `regex` cannot compile never matches and always yields 1: both crates share
/// one parser, so there is nothing left to grade against.
pub fn regex_distance(value: &str, pattern: &str) -> f64 {
    let Some(compiled) = compiled(pattern) else {
        return 1.0;
    };
    if compiled.full_match.is_match(value) {
        return 0.0;
    }
    match &compiled.nfa {
        Some(nfa) => nfa.distance(value).max(MIN_MISS),
        None => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_match_is_zero() {
        assert_eq!(regex_distance("abc", "abc"), 0.0);
        assert_eq!(regex_distance("aaaa", "a*"), 0.0);
        assert_eq!(regex_distance("", "a*"), 0.0);
        assert_eq!(regex_distance("x7", "(x|y)[0-9]{1,3}"), 0.0);
    }

    #[test]
    fn test_insertions_and_deletions() {
        assert_eq!(regex_distance("", "abc"), 3.0);
        assert_eq!(regex_distance("abcd", "abc"), 1.0);
        assert_eq!(regex_distance("ac", "abc"), 1.0);
    }

    #[test]
    fn test_substitution_prefers_close_chars() {
        let near = regex_distance("abd", "abc");
        let far = regex_distance("ab~", "abc");
        assert!(near > 0.0 && near < 1.0);
        assert!(far > near);
    }

    #[test]
    fn test_bounded_repetition() {
        assert_eq!(regex_distance("aaa", "a{2,3}"), 0.0);
        assert_eq!(regex_distance("aaaa", "a{2,3}"), 1.0);
        assert_eq!(regex_distance("a", "a{2}"), 1.0);
    }

    #[test]
    fn test_large_repetition_falls_back() {
        let pattern = "a{500}";
        assert_eq!(regex_distance(&"a".repeat(500), pattern), 0.0);
        assert_eq!(regex_distance("a", pattern), 1.0);
    }

    #[test]
    fn test_unparsable_pattern() {
        assert_eq!(regex_distance("abc", "(abc"), 1.0);
        assert_eq!(regex_distance("(abc", "(abc"), 1.0);
        assert!(compiled("(abc").is_none());
    }

    #[test]
    fn test_assertions_are_honoured() {
        assert!(!regex::Regex::new(r"^(?:\d+\b[a-z]+)$").unwrap().is_match("12ab"));
        assert!(regex_distance("12ab", r"\d+\b[a-z]+") > 0.0);
        assert!(regex_distance("ab", "a^b") > 0.0);
        assert!(regex_distance("ab", "a$b") > 0.0);
        assert_eq!(regex_distance("12 ab", r"\d+\b [a-z]+"), 0.0);
        assert_eq!(regex_distance("ab", "^ab$"), 0.0);
    }

    #[test]
    fn test_cache_is_bounded() {
        for n in 0..MAX_CACHED + 10 {
            regex_distance("x", &format!("x{{{n}}}"));
        }
        let cache = AUTOMATA.lock().unwrap();
        assert!(cache.len() <= MAX_CACHED);
        assert!(!cache.contains_key("(abc"));
    }
}
