use el_core::{
    Accessor, ArithOp, ArithTarget, CompOp, ELArithFact, ELComparison, ELError, ELFact, ELRule,
    ELValue, ELVar, EdgeKind, ListElem, Operand, PairTerm, PathElem, RootRef, RuleAction,
};
use lasso::Rodeo;

use crate::lexer::{Lexed, Token, tokenize};
use crate::names::{ARITH_TOKENS, COMP_TOKENS};

/// One top-level instruction for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Fact(ELFact),
    Bind {
        var: ELVar,
        target: Option<ELFact>,
    },
    Arith(ELArithFact),
}

struct Cursor<'a> {
    toks: &'a [Lexed<'a>],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(toks: &'a [Lexed<'a>]) -> Cursor<'a> {
        Cursor { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Lexed<'a>> {
        self.toks.get(self.pos)
    }

    fn peek_tok(&self) -> Option<Token> {
        self.peek().map(|l| l.tok)
    }

    fn next(&mut self) -> Option<&'a Lexed<'a>> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.peek_tok() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<&'a Lexed<'a>, ELError> {
        match self.peek() {
            Some(l) if l.tok == tok => {
                self.pos += 1;
                Ok(l)
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(Token::Newline) {}
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn error(&self, msg: impl Into<String>) -> ELError {
        match self.peek().or_else(|| self.toks.last()) {
            Some(l) => ELError::Parse {
                line: l.line,
                col: l.col,
                found: l.text.to_string(),
                msg: msg.into(),
            },
            None => ELError::Parse {
                line: 1,
                col: 1,
                found: String::new(),
                msg: msg.into(),
            },
        }
    }
}

/// Parse a whole input into statements. Statements separate on newlines or
/// commas; a parse error leaves nothing behind.
pub fn parse(input: &str, rodeo: &mut Rodeo) -> Result<Vec<Statement>, ELError> {
    let toks = tokenize(input)?;
    let mut cur = Cursor::new(&toks);
    let mut out = Vec::new();
    loop {
        while cur.eat(Token::Newline) || cur.eat(Token::Comma) {}
        if cur.at_end() {
            break;
        }
        out.push(statement(&mut cur, rodeo)?);
        match cur.peek_tok() {
            None | Some(Token::Newline) | Some(Token::Comma) => {}
            _ => return Err(cur.error("expected a newline or comma between statements")),
        }
    }
    Ok(out)
}

/// Single-fact convenience used by the engine's string entry points.
pub fn parse_one_fact(input: &str, rodeo: &mut Rodeo) -> Result<ELFact, ELError> {
    let mut stmts = parse(input, rodeo)?;
    match (stmts.len(), stmts.pop()) {
        (1, Some(Statement::Fact(f))) => Ok(f),
        _ => Err(ELError::consistency("expected exactly one fact")),
    }
}

fn statement(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<Statement, ELError> {
    match cur.peek_tok() {
        Some(Token::Tilde) => {
            cur.next();
            let fact = fact_any_root(cur, rodeo)?;
            Ok(Statement::Fact(fact.negate()))
        }
        Some(Token::Dot) => {
            let fact = fact_from_dot(cur, rodeo)?;
            if let Some(op) = peek_arith_op(cur) {
                cur.next();
                let rhs = operand(cur, rodeo)?;
                if fact.is_query() {
                    return Err(cur.error("arithmetic target cannot be a query"));
                }
                Ok(Statement::Arith(ELArithFact::new(
                    ArithTarget::Fact(Box::new(fact)),
                    op,
                    rhs,
                )))
            } else {
                Ok(Statement::Fact(fact))
            }
        }
        Some(Token::Dollar) | Some(Token::At) => {
            let var = variable(cur, rodeo)?;
            match cur.peek_tok() {
                Some(Token::BindArrow) => {
                    cur.next();
                    let target = match cur.peek_tok() {
                        Some(Token::Dot) => Some(fact_from_dot(cur, rodeo)?),
                        None | Some(Token::Newline) | Some(Token::Comma) => None,
                        _ => return Err(cur.error("expected a fact after <-")),
                    };
                    Ok(Statement::Bind { var, target })
                }
                Some(Token::Dot) => {
                    cur.next();
                    let fact = fact_body(cur, rodeo, ELFact::anchored_at(RootRef::Var(var)))?;
                    if let Some(op) = peek_arith_op(cur) {
                        cur.next();
                        let rhs = operand(cur, rodeo)?;
                        Ok(Statement::Arith(ELArithFact::new(
                            ArithTarget::Fact(Box::new(fact)),
                            op,
                            rhs,
                        )))
                    } else {
                        Ok(Statement::Fact(fact))
                    }
                }
                Some(_) if peek_arith_op(cur).is_some() => {
                    let op = peek_arith_op(cur).unwrap();
                    cur.next();
                    let rhs = operand(cur, rodeo)?;
                    Ok(Statement::Arith(ELArithFact::new(
                        ArithTarget::Var(var),
                        op,
                        rhs,
                    )))
                }
                _ => Err(cur.error("expected <-, an edge, or an arithmetic operator")),
            }
        }
        _ => Err(cur.error("expected a statement")),
    }
}

/// A fact starting either at `.` or at a variable root.
fn fact_any_root(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ELFact, ELError> {
    match cur.peek_tok() {
        Some(Token::Dot) => fact_from_dot(cur, rodeo),
        Some(Token::Dollar) | Some(Token::At) => {
            let var = variable(cur, rodeo)?;
            cur.expect(Token::Dot, "'.' after a root variable")?;
            fact_body(cur, rodeo, ELFact::anchored_at(RootRef::Var(var)))
        }
        _ => Err(cur.error("expected a fact")),
    }
}

fn fact_from_dot(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ELFact, ELError> {
    cur.expect(Token::Dot, "'.'")?;
    fact_body(cur, rodeo, ELFact::anchored())
}

/// Pairs separated by edges, then an optional `?`. Lists and rule braces
/// only terminate a path.
fn fact_body(cur: &mut Cursor, rodeo: &mut Rodeo, fact: ELFact) -> Result<ELFact, ELError> {
    let mut fact = fact;
    loop {
        let term = pair_term(cur, rodeo)?;
        let terminal_only = matches!(term, PairTerm::List(_) | PairTerm::Rule(_));
        match cur.peek_tok() {
            Some(Token::Dot) if !terminal_only => {
                cur.next();
                fact = fact.push(PathElem::pair(term, EdgeKind::Dot));
            }
            Some(Token::Bang) if !terminal_only => {
                cur.next();
                fact = fact.push(PathElem::pair(term, EdgeKind::Ex));
            }
            _ => {
                fact = fact.push(PathElem::pair(term, EdgeKind::Dot));
                if cur.eat(Token::Question) {
                    fact = fact.push(PathElem::Query);
                }
                return Ok(fact);
            }
        }
    }
}

fn pair_term(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<PairTerm, ELError> {
    match cur.peek_tok() {
        Some(Token::Dollar) | Some(Token::At) => Ok(PairTerm::Var(variable(cur, rodeo)?)),
        Some(Token::LBracket) => Ok(PairTerm::List(list(cur, rodeo)?)),
        Some(Token::LBrace) => Ok(PairTerm::Rule(rule(cur, rodeo)?)),
        _ => Ok(PairTerm::Val(value(cur, rodeo)?)),
    }
}

fn value(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ELValue, ELError> {
    let lexed = match cur.peek() {
        Some(l) => *l,
        None => return Err(cur.error("expected a value")),
    };
    let out = match lexed.tok {
        Token::Ident => ELValue::Sym(rodeo.get_or_intern(lexed.text)),
        Token::Str => {
            let inner = &lexed.text[1..lexed.text.len() - 1];
            ELValue::Str(rodeo.get_or_intern(inner))
        }
        Token::Int => {
            let digits = lexed.text.replace('_', "");
            let n = digits
                .parse::<i64>()
                .map_err(|_| cur.error("integer out of range"))?;
            ELValue::Int(n)
        }
        Token::Decimal => {
            let digits = lexed.text.replace('_', "").replace('d', ".");
            let f = digits
                .parse::<f64>()
                .map_err(|_| cur.error("malformed decimal"))?;
            ELValue::Float(f)
        }
        Token::Fraction => {
            let digits = lexed.text.replace('_', "");
            let (num, den) = digits
                .split_once('/')
                .ok_or_else(|| cur.error("malformed fraction"))?;
            let num = num
                .parse::<i64>()
                .map_err(|_| cur.error("fraction numerator out of range"))?;
            let den = den
                .parse::<i64>()
                .map_err(|_| cur.error("fraction denominator out of range"))?;
            ELValue::rat(num, den).map_err(|_| cur.error("zero denominator"))?
        }
        _ => return Err(cur.error("expected a value")),
    };
    cur.next();
    Ok(out)
}

fn variable(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ELVar, ELError> {
    let forall = match cur.next().map(|l| l.tok) {
        Some(Token::Dollar) => false,
        Some(Token::At) => true,
        _ => return Err(cur.error("expected a variable")),
    };
    let is_path = cur.eat(Token::DotDot);
    let name = cur.expect(Token::Ident, "a variable name")?;
    let name = rodeo.get_or_intern(name.text);
    let mut var = if forall {
        ELVar::forall(name)
    } else {
        ELVar::exis(name)
    };
    if is_path {
        var = var.path();
    }
    if cur.eat(Token::LParen) {
        let access = match cur.peek_tok() {
            Some(Token::Int) => {
                let lexed = cur.next().unwrap();
                let n = lexed
                    .text
                    .replace('_', "")
                    .parse::<i64>()
                    .map_err(|_| cur.error("accessor index out of range"))?;
                Accessor::Index(n)
            }
            Some(Token::Dollar) | Some(Token::At) => {
                Accessor::Var(Box::new(variable(cur, rodeo)?))
            }
            _ => return Err(cur.error("expected an accessor index or variable")),
        };
        cur.expect(Token::RParen, "')'")?;
        var = var.with_access(access);
    }
    Ok(var)
}

fn list(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<Vec<ListElem>, ELError> {
    cur.expect(Token::LBracket, "'['")?;
    cur.skip_newlines();
    let mut items = Vec::new();
    if cur.eat(Token::RBracket) {
        return Ok(items);
    }
    loop {
        cur.skip_newlines();
        items.push(list_elem(cur, rodeo)?);
        cur.skip_newlines();
        if cur.eat(Token::Comma) {
            continue;
        }
        cur.expect(Token::RBracket, "']' or ','")?;
        return Ok(items);
    }
}

fn list_elem(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ListElem, ELError> {
    match cur.peek_tok() {
        Some(Token::Tilde) => {
            cur.next();
            let fact = fact_any_root(cur, rodeo)?;
            Ok(ListElem::Fact(fact.negate()))
        }
        Some(Token::Dot) => {
            let fact = fact_from_dot(cur, rodeo)?;
            if let Some(op) = peek_arith_op(cur) {
                cur.next();
                let rhs = operand(cur, rodeo)?;
                Ok(ListElem::Arith(ELArithFact::new(
                    ArithTarget::Fact(Box::new(fact)),
                    op,
                    rhs,
                )))
            } else {
                Ok(ListElem::Fact(fact))
            }
        }
        Some(Token::Dollar) | Some(Token::At) => {
            let var = variable(cur, rodeo)?;
            if let Some(op) = peek_comp_op(cur) {
                Ok(ListElem::Comp(comparison(cur, rodeo, var, op)?))
            } else if let Some(op) = peek_arith_op(cur) {
                cur.next();
                let rhs = operand(cur, rodeo)?;
                Ok(ListElem::Arith(ELArithFact::new(
                    ArithTarget::Var(var),
                    op,
                    rhs,
                )))
            } else if cur.eat(Token::Dot) {
                let fact = fact_body(cur, rodeo, ELFact::anchored_at(RootRef::Var(var)))?;
                if let Some(op) = peek_arith_op(cur) {
                    cur.next();
                    let rhs = operand(cur, rodeo)?;
                    Ok(ListElem::Arith(ELArithFact::new(
                        ArithTarget::Fact(Box::new(fact)),
                        op,
                        rhs,
                    )))
                } else {
                    Ok(ListElem::Fact(fact))
                }
            } else {
                Ok(ListElem::Var(var))
            }
        }
        Some(Token::LBracket) => Ok(ListElem::List(list(cur, rodeo)?)),
        _ => Ok(ListElem::Val(value(cur, rodeo)?)),
    }
}

fn peek_comp_op(cur: &Cursor) -> Option<CompOp> {
    let lexed = cur.peek()?;
    match lexed.tok {
        Token::Less
        | Token::Greater
        | Token::LessEqual
        | Token::GreaterEqual
        | Token::EqualEqual
        | Token::NotEqual
        | Token::At
        | Token::NotContains
        | Token::NearEqual => COMP_TOKENS.get(lexed.text).copied(),
        _ => None,
    }
}

fn peek_arith_op(cur: &Cursor) -> Option<ArithOp> {
    let lexed = cur.peek()?;
    match lexed.tok {
        Token::Plus | Token::Minus | Token::Star | Token::Slash | Token::Caret | Token::Percent => {
            ARITH_TOKENS.get(lexed.text).copied()
        }
        Token::Ident => ARITH_TOKENS.get(lexed.text).copied(),
        _ => None,
    }
}

fn comparison(
    cur: &mut Cursor,
    rodeo: &mut Rodeo,
    lhs: ELVar,
    op: CompOp,
) -> Result<ELComparison, ELError> {
    cur.next();
    let near = if op == CompOp::Near && cur.eat(Token::LParen) {
        let tol = operand(cur, rodeo)?;
        cur.expect(Token::RParen, "')' after the tolerance")?;
        Some(tol)
    } else {
        None
    };
    let rhs = operand(cur, rodeo)?;
    Ok(ELComparison {
        lhs,
        op,
        rhs,
        near,
    })
}

fn operand(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<Operand, ELError> {
    match cur.peek_tok() {
        Some(Token::Dollar) | Some(Token::At) => Ok(Operand::Var(variable(cur, rodeo)?)),
        Some(Token::Ident) if ARITH_TOKENS.get(cur.peek().unwrap().text).is_none() => {
            Ok(Operand::Val(value(cur, rodeo)?))
        }
        Some(Token::Int) | Some(Token::Decimal) | Some(Token::Fraction) | Some(Token::Str)
        | Some(Token::Ident) => Ok(Operand::Val(value(cur, rodeo)?)),
        _ => Err(cur.error("expected a value or variable")),
    }
}

/// `{ conditions | comparisons -> actions }`, the pipe segment optional.
fn rule(cur: &mut Cursor, rodeo: &mut Rodeo) -> Result<ELRule, ELError> {
    cur.expect(Token::LBrace, "'{'")?;
    cur.skip_newlines();

    let mut conditions = Vec::new();
    loop {
        cur.skip_newlines();
        match cur.peek_tok() {
            Some(Token::Pipe) | Some(Token::Arrow) => break,
            Some(Token::Tilde) => {
                cur.next();
                conditions.push(fact_any_root(cur, rodeo)?.negate());
            }
            Some(Token::Dot) | Some(Token::Dollar) | Some(Token::At) => {
                conditions.push(fact_any_root(cur, rodeo)?);
            }
            _ => return Err(cur.error("expected a condition, '|' or '->'")),
        }
        cur.skip_newlines();
        if !cur.eat(Token::Comma) && !matches!(cur.peek_tok(), Some(Token::Pipe) | Some(Token::Arrow))
        {
            return Err(cur.error("expected ',', '|' or '->' in a rule"));
        }
    }

    let mut comparisons = Vec::new();
    if cur.eat(Token::Pipe) {
        loop {
            cur.skip_newlines();
            if cur.peek_tok() == Some(Token::Arrow) {
                break;
            }
            let lhs = variable(cur, rodeo)?;
            let op = peek_comp_op(cur)
                .ok_or_else(|| cur.error("expected a comparison operator"))?;
            comparisons.push(comparison(cur, rodeo, lhs, op)?);
            cur.skip_newlines();
            if !cur.eat(Token::Comma) && cur.peek_tok() != Some(Token::Arrow) {
                return Err(cur.error("expected ',' or '->' after a comparison"));
            }
        }
    }

    cur.expect(Token::Arrow, "'->'")?;
    cur.skip_newlines();

    let mut actions = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.eat(Token::RBrace) {
            break;
        }
        let elem = list_elem(cur, rodeo)?;
        let action = match elem {
            ListElem::Fact(f) => RuleAction::Fact(f),
            ListElem::Arith(a) => RuleAction::Arith(a),
            _ => return Err(cur.error("rule actions must be facts or arithmetic")),
        };
        actions.push(action);
        cur.skip_newlines();
        if !cur.eat(Token::Comma) && cur.peek_tok() != Some(Token::RBrace) {
            return Err(cur.error("expected ',' or '}' after an action"));
        }
    }

    Ok(ELRule::new(conditions, comparisons, actions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> (Vec<Statement>, Rodeo) {
        let mut rodeo = Rodeo::new();
        let stmts = parse(input, &mut rodeo).unwrap();
        (stmts, rodeo)
    }

    fn first_fact(stmts: &[Statement]) -> &ELFact {
        match &stmts[0] {
            Statement::Fact(f) => f,
            other => panic!("expected a fact, got {other:?}"),
        }
    }

    #[test]
    fn simple_fact() {
        let (stmts, rodeo) = parse_ok(".this.is.a.test");
        assert_eq!(stmts.len(), 1);
        assert_eq!(first_fact(&stmts).render(&rodeo), ".this.is.a.test");
    }

    #[test]
    fn multiple_statements_on_lines_and_commas() {
        let (stmts, _) = parse_ok(".a.b.c, .a.b.d\n.a.b.e");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn exclusion_edges_survive() {
        let (stmts, rodeo) = parse_ok(".this.is.a!test");
        assert_eq!(first_fact(&stmts).render(&rodeo), ".this.is.a!test");
    }

    #[test]
    fn query_and_negation() {
        let (stmts, rodeo) = parse_ok(".a.b.c?\n~.a.b.c\n~.a.b.c?");
        assert!(first_fact(&stmts).is_query());
        match (&stmts[1], &stmts[2]) {
            (Statement::Fact(retract), Statement::Fact(negq)) => {
                assert!(retract.negated && !retract.is_query());
                assert!(negq.negated && negq.is_query());
                assert_eq!(negq.render(&rodeo), "~.a.b.c?");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numbers_in_facts() {
        let (stmts, rodeo) = parse_ok(".n.[5_000_000, -5, 1d5, 1/5]");
        let expanded = first_fact(&stmts).expand();
        let rendered: Vec<String> = expanded.iter().map(|f| f.render(&rodeo)).collect();
        assert_eq!(rendered, vec![".n.5000000", ".n.-5", ".n.1d5", ".n.1/5"]);
    }

    #[test]
    fn multiline_array() {
        let (stmts, _) = parse_ok(".this.is.an.array.[\n  1,\n  2,\n  3\n]");
        assert_eq!(first_fact(&stmts).expand().len(), 3);
    }

    #[test]
    fn empty_array() {
        let (stmts, rodeo) = parse_ok(".a.b.[]");
        let expanded = first_fact(&stmts).expand();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].render(&rodeo), ".a.b");
    }

    #[test]
    fn variables_and_accessors() {
        let (stmts, rodeo) = parse_ok(".a.$x.@y.$..z.$w(3).$v($i)?");
        let fact = first_fact(&stmts);
        assert_eq!(fact.render(&rodeo), ".a.$x.@y.$..z.$w(3).$v($i)?");
        assert_eq!(fact.vars.len(), 6);
    }

    #[test]
    fn condition_array_with_queries() {
        let (stmts, _) = parse_ok(".test.conditions.[ .a.b.$x?, .a.c.$y? ]");
        let fact = first_fact(&stmts);
        let expanded = fact.expand();
        assert_eq!(expanded.len(), 2);
    }

    #[test]
    fn comparison_elements() {
        let (stmts, _) = parse_ok(".test.comparisons.[ $x < $y, $x ~=(10) $y ]");
        let fact = first_fact(&stmts);
        let PathElem::Pair {
            term: PairTerm::List(items),
            ..
        } = fact.elems.last().unwrap()
        else {
            panic!("expected a list terminal");
        };
        match (&items[0], &items[1]) {
            (ListElem::Comp(a), ListElem::Comp(b)) => {
                assert_eq!(a.op, CompOp::Lesser);
                assert_eq!(b.op, CompOp::Near);
                assert!(b.near.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arithmetic_elements() {
        let (stmts, _) = parse_ok(".test.arithmetic.[ $y + 5, $..x + $y, $z rnd 0 ]");
        let fact = first_fact(&stmts);
        let PathElem::Pair {
            term: PairTerm::List(items),
            ..
        } = fact.elems.last().unwrap()
        else {
            panic!("expected a list terminal");
        };
        assert_eq!(items.len(), 3);
        match &items[1] {
            ListElem::Arith(a) => {
                assert_eq!(a.op, ArithOp::Plus);
                assert!(matches!(&a.target, ArithTarget::Var(v) if v.is_path));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &items[2] {
            ListElem::Arith(a) => assert_eq!(a.op, ArithOp::Rand),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn path_var_rooted_action_fact() {
        let (stmts, rodeo) = parse_ok(".test.actions.[ $..x.bloo ]");
        let fact = first_fact(&stmts);
        let expanded = fact.expand();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].render(&rodeo), ".test.actions.$..x.bloo");
    }

    #[test]
    fn rule_braces() {
        let (stmts, _) =
            parse_ok(".r.{ .a.b.$x?, .a.c.$y? | $x < $y -> .a.d.$x, $y + 1 }");
        let fact = first_fact(&stmts);
        let PathElem::Pair {
            term: PairTerm::Rule(rule),
            ..
        } = fact.elems.last().unwrap()
        else {
            panic!("expected a rule terminal");
        };
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.comparisons.len(), 1);
        assert_eq!(rule.actions.len(), 2);
    }

    #[test]
    fn rule_without_pipe_segment() {
        let (stmts, _) = parse_ok(".r.{ .a.b? -> .a.c }");
        let fact = first_fact(&stmts);
        let PathElem::Pair {
            term: PairTerm::Rule(rule),
            ..
        } = fact.elems.last().unwrap()
        else {
            panic!("expected a rule terminal");
        };
        assert!(rule.comparisons.is_empty());
        assert_eq!(rule.conditions.len(), 1);
    }

    #[test]
    fn bind_and_unbind() {
        let (stmts, _) = parse_ok("$x <- .a.b.c\n$x <-");
        match (&stmts[0], &stmts[1]) {
            (
                Statement::Bind { target: Some(_), .. },
                Statement::Bind { target: None, .. },
            ) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn top_level_arithmetic() {
        let (stmts, _) = parse_ok(".a.b.c + 5");
        match &stmts[0] {
            Statement::Arith(a) => {
                assert_eq!(a.op, ArithOp::Plus);
                assert!(matches!(a.target, ArithTarget::Fact(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comments_are_ignored() {
        let (stmts, _) = parse_ok("#.this.is.a.bad.fact\n.a.b.c");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn comment_ends_at_line_end() {
        let (stmts, rodeo) = parse_ok(".this.is.a.test#.but.not.this.far");
        assert_eq!(first_fact(&stmts).render(&rodeo), ".this.is.a.test");
    }

    #[test]
    fn missing_separator_is_an_error() {
        let mut rodeo = Rodeo::new();
        assert!(parse(".a.b .c.d", &mut rodeo).is_err());
    }

    #[test]
    fn round_trip_through_render() {
        let inputs = [
            ".this.is.a.test",
            ".a.b!c",
            "~.a.b.c?",
            ".a.$x.$y?",
            ".w.[1, 2, 3]",
            "$..x.bloo",
        ];
        for input in inputs {
            let mut rodeo = Rodeo::new();
            let stmts = parse(input, &mut rodeo).unwrap();
            let Statement::Fact(fact) = &stmts[0] else {
                panic!("expected a fact");
            };
            let rendered = fact.render(&rodeo);
            let again = parse(&rendered, &mut rodeo).unwrap();
            let Statement::Fact(fact2) = &again[0] else {
                panic!("expected a fact");
            };
            assert_eq!(fact, fact2, "round trip failed for {input}");
        }
    }
}
