//! Stack operation interpreter
//!
//! Replays push_swap operation scripts against the A/B stack pair. The bulk
//! tester loop and the visualizer feed both go through this module, so a
//! verdict means the same thing on every path.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the eleven push_swap operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Sa,
    Sb,
    Ss,
    Pa,
    Pb,
    Ra,
    Rb,
    Rr,
    Rra,
    Rrb,
    Rrr,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Sa => "sa",
            Op::Sb => "sb",
            Op::Ss => "ss",
            Op::Pa => "pa",
            Op::Pb => "pb",
            Op::Ra => "ra",
            Op::Rb => "rb",
            Op::Rr => "rr",
            Op::Rra => "rra",
            Op::Rrb => "rrb",
            Op::Rrr => "rrr",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unrecognized operation code in a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid operation `{token}`")]
pub struct InvalidOp {
    pub token: String,
}

impl FromStr for Op {
    type Err = InvalidOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sa" => Ok(Op::Sa),
            "sb" => Ok(Op::Sb),
            "ss" => Ok(Op::Ss),
            "pa" => Ok(Op::Pa),
            "pb" => Ok(Op::Pb),
            "ra" => Ok(Op::Ra),
            "rb" => Ok(Op::Rb),
            "rr" => Ok(Op::Rr),
            "rra" => Ok(Op::Rra),
            "rrb" => Ok(Op::Rrb),
            "rrr" => Ok(Op::Rrr),
            _ => Err(InvalidOp {
                token: s.to_string(),
            }),
        }
    }
}

/// Parse a program's stdout into an operation list.
///
/// Lines are trimmed and blank lines skipped. The first token outside the
/// operation vocabulary fails the whole script.
pub fn parse_script(script: &str) -> Result<Vec<Op>, InvalidOp> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Op::from_str)
        .collect()
}

/// Final state of a replayed script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Sorted,
    NotSorted,
    StackBNotEmpty,
    InvalidOperation,
}

impl Verdict {
    pub fn is_sorted(&self) -> bool {
        matches!(self, Verdict::Sorted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Sorted => "sorted",
            Verdict::NotSorted => "not_sorted",
            Verdict::StackBNotEmpty => "stack_b_not_empty",
            Verdict::InvalidOperation => "invalid_operation",
        };
        write!(f, "{}", s)
    }
}

/// The A/B stack pair. The head of each deque is the stack top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPair {
    a: VecDeque<i32>,
    b: VecDeque<i32>,
}

impl StackPair {
    /// Stack A holds the initial sequence, stack B starts empty.
    pub fn new(initial: &[i32]) -> Self {
        Self {
            a: initial.iter().copied().collect(),
            b: VecDeque::new(),
        }
    }

    #[allow(dead_code)]
    pub fn a(&self) -> &VecDeque<i32> {
        &self.a
    }

    #[allow(dead_code)]
    pub fn b(&self) -> &VecDeque<i32> {
        &self.b
    }

    /// Apply one operation. Operations whose stack-length preconditions are
    /// unmet are silent no-ops, matching the programs whose scripts get
    /// replayed here.
    pub fn apply(&mut self, op: Op) {
        match op {
            Op::Sa => swap_top(&mut self.a),
            Op::Sb => swap_top(&mut self.b),
            Op::Ss => {
                swap_top(&mut self.a);
                swap_top(&mut self.b);
            }
            Op::Pa => push_over(&mut self.b, &mut self.a),
            Op::Pb => push_over(&mut self.a, &mut self.b),
            Op::Ra => rotate(&mut self.a),
            Op::Rb => rotate(&mut self.b),
            Op::Rr => {
                rotate(&mut self.a);
                rotate(&mut self.b);
            }
            Op::Rra => reverse_rotate(&mut self.a),
            Op::Rrb => reverse_rotate(&mut self.b),
            Op::Rrr => {
                reverse_rotate(&mut self.a);
                reverse_rotate(&mut self.b);
            }
        }
    }

    /// Sorted means stack B is empty and stack A is in non-decreasing order.
    pub fn verdict(&self) -> Verdict {
        if !self.b.is_empty() {
            return Verdict::StackBNotEmpty;
        }
        if !is_non_decreasing(&self.a) {
            return Verdict::NotSorted;
        }
        Verdict::Sorted
    }
}

fn swap_top(stack: &mut VecDeque<i32>) {
    if stack.len() >= 2 {
        stack.swap(0, 1);
    }
}

fn push_over(from: &mut VecDeque<i32>, to: &mut VecDeque<i32>) {
    if let Some(v) = from.pop_front() {
        to.push_front(v);
    }
}

fn rotate(stack: &mut VecDeque<i32>) {
    if let Some(v) = stack.pop_front() {
        stack.push_back(v);
    }
}

fn reverse_rotate(stack: &mut VecDeque<i32>) {
    if let Some(v) = stack.pop_back() {
        stack.push_front(v);
    }
}

fn is_non_decreasing(stack: &VecDeque<i32>) -> bool {
    stack.iter().zip(stack.iter().skip(1)).all(|(x, y)| x <= y)
}

/// Replay a full operation list from an initial sequence.
///
/// Pure fold of `apply`. The tester loop calls this once per trial; the
/// step-wise [`Replay`] must agree with it at every cursor position.
pub fn run(initial: &[i32], ops: &[Op]) -> Verdict {
    let mut stacks = StackPair::new(initial);
    for &op in ops {
        stacks.apply(op);
    }
    stacks.verdict()
}

/// Cursor-driven replay for step-wise animation.
///
/// Holds the stack pair, the parsed script, and the index of the next
/// operation. Pausing an animation is simply not calling [`Replay::step`];
/// resuming picks up from the stored cursor.
#[derive(Debug, Clone)]
pub struct Replay {
    stacks: StackPair,
    ops: Vec<Op>,
    cursor: usize,
}

impl Replay {
    pub fn new(initial: &[i32], ops: Vec<Op>) -> Self {
        Self {
            stacks: StackPair::new(initial),
            ops,
            cursor: 0,
        }
    }

    /// Apply the operation at the cursor and advance. Returns the applied
    /// operation, or `None` once the script is exhausted.
    pub fn step(&mut self) -> Option<Op> {
        let op = *self.ops.get(self.cursor)?;
        self.stacks.apply(op);
        self.cursor += 1;
        Some(op)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor == self.ops.len()
    }

    #[allow(dead_code)]
    pub fn stacks(&self) -> &StackPair {
        &self.stacks
    }

    /// Verdict for the current stack contents. Meaningful once the replay is
    /// finished; stable across repeated calls.
    pub fn verdict(&self) -> Verdict {
        self.stacks.verdict()
    }
}
