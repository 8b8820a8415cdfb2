use el_core::{ArithOp, CompOp};
use phf::phf_map;

/// The named child subtrees a runnable node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Conditions,
    Comparisons,
    Arithmetic,
    Actions,
    Output,
    Next,
}

pub static SECTIONS: phf::Map<&'static str, Section> = phf_map! {
    "conditions" => Section::Conditions,
    "comparisons" => Section::Comparisons,
    "arithmetic" => Section::Arithmetic,
    "actions" => Section::Actions,
    "output" => Section::Output,
    "next" => Section::Next,
};

/// Surface spellings of the comparison operators.
pub static COMP_TOKENS: phf::Map<&'static str, CompOp> = phf_map! {
    "<" => CompOp::Lesser,
    ">" => CompOp::Greater,
    "<=" => CompOp::LesserEqual,
    ">=" => CompOp::GreaterEqual,
    "==" => CompOp::Equal,
    "!=" => CompOp::NotEqual,
    "@" => CompOp::Contains,
    "!@" => CompOp::NotContains,
    "~=" => CompOp::Near,
};

/// Surface spellings of the arithmetic operators. `exp` is IR-only and has
/// no entry here.
pub static ARITH_TOKENS: phf::Map<&'static str, ArithOp> = phf_map! {
    "-" => ArithOp::Minus,
    "+" => ArithOp::Plus,
    "*" => ArithOp::Mul,
    "/" => ArithOp::Div,
    "^" => ArithOp::Pow,
    "%" => ArithOp::Mod,
    "rnd" => ArithOp::Rand,
    "lg" => ArithOp::Log,
};
