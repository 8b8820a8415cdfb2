use el_core::{ELFact, ELValue, EdgeKind, ListElem, PairTerm, PathElem};
use el_engine::{ELTrie, NodeValue};
use el_parser::{Statement, parse};
use lasso::Rodeo;

fn fact(rodeo: &mut Rodeo, input: &str) -> ELFact {
    let stmts = parse(input, rodeo).unwrap();
    match stmts.into_iter().next() {
        Some(Statement::Fact(f)) => f,
        other => panic!("expected a fact from {input}, got {other:?}"),
    }
}

fn push(trie: &mut ELTrie, rodeo: &mut Rodeo, input: &str) {
    for f in fact(rodeo, input).expand() {
        assert!(trie.push(&f).is_success(), "push failed for {input}");
    }
}

fn hit(trie: &ELTrie, rodeo: &mut Rodeo, query: &str) -> bool {
    trie.query(&fact(rodeo, query)).unwrap().is_success()
}

#[test]
fn starts_empty_and_fills_on_add() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    assert!(trie.is_empty());
    push(&mut trie, &mut rodeo, ".a.b.c");
    assert!(!trie.is_empty());
    assert!(hit(&trie, &mut rodeo, ".a.b.c?"));
    assert!(hit(&trie, &mut rodeo, ".a.b?"));
    assert!(!hit(&trie, &mut rodeo, ".a.b.d?"));
}

#[test]
fn adding_twice_does_not_duplicate() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.c");
    push(&mut trie, &mut rodeo, ".a.b.c");
    assert_eq!(trie.node(trie.root()).child_count(), 1);
    let q = fact(&mut rodeo, ".a.b.$x?");
    let result = trie.query(&q).unwrap();
    assert_eq!(result.bindings().unwrap().len(), 1);
}

#[test]
fn exclusion_addition_queries_both_ways() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".this.is.a!test");
    // an EX query pair requires the EX edge; a DOT pair matches either kind
    assert!(hit(&trie, &mut rodeo, ".this.is.a!test?"));
    assert!(hit(&trie, &mut rodeo, ".this.is.a.test?"));
    // but an EX query over a DOT edge fails
    push(&mut trie, &mut rodeo, ".other.place.x");
    assert!(!hit(&trie, &mut rodeo, ".other.place!x?"));
}

#[test]
fn exclusion_displaces_siblings() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.c");
    push(&mut trie, &mut rodeo, ".a.b.d");
    assert!(hit(&trie, &mut rodeo, ".a.b.c?"));
    push(&mut trie, &mut rodeo, ".a.b!e");
    assert!(!hit(&trie, &mut rodeo, ".a.b.c?"));
    assert!(!hit(&trie, &mut rodeo, ".a.b.d?"));
    assert!(hit(&trie, &mut rodeo, ".a.b!e?"));
}

#[test]
fn exclusion_rewrite_replaces_the_single_child() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a!b");
    push(&mut trie, &mut rodeo, ".a!c");
    assert!(!hit(&trie, &mut rodeo, ".a.b?"));
    assert!(hit(&trie, &mut rodeo, ".a!c?"));
}

#[test]
fn exclusion_downgrades_to_permissive() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a!b");
    push(&mut trie, &mut rodeo, ".a.c");
    // both children coexist after the downgrade
    assert!(hit(&trie, &mut rodeo, ".a.b?"));
    assert!(hit(&trie, &mut rodeo, ".a.c?"));
    // the downgraded edge no longer answers an exclusive query
    assert!(!hit(&trie, &mut rodeo, ".a!b?"));
}

#[test]
fn pop_detaches_the_leaf_and_nothing_else() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.c");
    assert!(trie.pop(&fact(&mut rodeo, ".a.b.c")).is_success());
    assert!(!hit(&trie, &mut rodeo, ".a.b.c?"));
    // the intermediate chain stays, now empty
    assert!(hit(&trie, &mut rodeo, ".a.b?"));
    // popping again misses quietly
    assert!(trie.pop(&fact(&mut rodeo, ".a.b.c")).is_fail());
}

#[test]
fn pop_takes_a_subtree_with_it() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".r.t.this.is.a.test");
    assert!(trie.pop(&fact(&mut rodeo, ".r.t.this.is")).is_success());
    assert!(!hit(&trie, &mut rodeo, ".r.t.this.is.a.test?"));
    assert!(hit(&trie, &mut rodeo, ".r.t.this?"));
}

#[test]
fn list_at_non_terminal_is_rejected() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    let a = ELValue::sym(&mut rodeo, "a");
    let bad = ELFact::anchored()
        .push(PathElem::pair(
            PairTerm::List(vec![ListElem::Val(ELValue::Int(1))]),
            EdgeKind::Dot,
        ))
        .pair(a);
    assert!(trie.push(&bad).is_fail());
}

#[test]
fn terminal_list_stores_as_a_leaf_value() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    let a = ELValue::sym(&mut rodeo, "a");
    let listed = ELFact::anchored().pair(a).list(vec![
        ListElem::Val(ELValue::Int(1)),
        ListElem::Val(ELValue::Int(2)),
    ]);
    assert!(trie.push(&listed).is_success());
    let q = fact(&mut rodeo, ".a.$x?");
    let result = trie.query(&q).unwrap();
    let x = rodeo.get_or_intern("x");
    let slices = result.bindings().unwrap().slices();
    assert_eq!(slices.len(), 1);
    assert_eq!(
        slices[0].get(x).unwrap().value,
        ELValue::List(vec![ELValue::Int(1), ELValue::Int(2)])
    );
}

#[test]
fn update_value_preserves_identity() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.10");
    let q = fact(&mut rodeo, ".a.$x?");
    let before = trie.query(&q).unwrap();
    let id = before.nodes()[0];

    trie.update_value(id, ELValue::Int(20)).unwrap();
    assert!(hit(&trie, &mut rodeo, ".a.20?"));
    assert!(!hit(&trie, &mut rodeo, ".a.10?"));
    let after = trie.query(&q).unwrap();
    assert_eq!(after.nodes()[0], id);
    assert_eq!(trie.node(id).value, NodeValue::Val(ELValue::Int(20)));
}

#[test]
fn variable_queries_share_a_key_set() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".this.is.a.first.test");
    push(&mut trie, &mut rodeo, ".this.is.a.second.blahh");
    let q = fact(&mut rodeo, ".this.is.a.$x.$y?");
    let result = trie.query(&q).unwrap();
    let frame = result.bindings().unwrap();
    assert_eq!(frame.len(), 2);
    let x = rodeo.get_or_intern("x");
    let y = rodeo.get_or_intern("y");
    for slice in frame.iter() {
        assert!(slice.contains(x));
        assert!(slice.contains(y));
        assert_eq!(slice.len(), 2);
    }
}

#[test]
fn repeated_variable_must_rebind_consistently() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.b");
    push(&mut trie, &mut rodeo, ".p.b.c");
    assert!(hit(&trie, &mut rodeo, ".a.$x.$x?"));
    assert!(!hit(&trie, &mut rodeo, ".p.$x.$x?"));
}

#[test]
fn negated_query_inverts() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    assert!(hit(&trie, &mut rodeo, "~.a.b.c?"));
    push(&mut trie, &mut rodeo, ".a.b.c");
    assert!(!hit(&trie, &mut rodeo, "~.a.b.c?"));
    assert!(hit(&trie, &mut rodeo, ".a.b.c?"));
}

#[test]
fn dfs_metrics_measure_the_tree() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.c");
    push(&mut trie, &mut rodeo, ".a.b.d");
    push(&mut trie, &mut rodeo, ".e");
    let metrics = trie.dfs_metrics().unwrap();
    assert_eq!(metrics.max_depth, 3);
    assert_eq!(metrics.leaves.len(), 3);
    assert!(metrics.rules.is_empty());
}

#[test]
fn dfs_runs_clean_after_heavy_mutation() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    push(&mut trie, &mut rodeo, ".a.b.c");
    push(&mut trie, &mut rodeo, ".a.b.d");
    push(&mut trie, &mut rodeo, ".a.b!e");
    push(&mut trie, &mut rodeo, ".a.b.f");
    trie.pop(&fact(&mut rodeo, ".a.b.f"));
    // detached nodes stay addressable but never re-enter the walk
    assert!(trie.dfs_metrics().is_ok());
}

#[test]
fn leaf_facts_reconstruct_sections() {
    let mut rodeo = Rodeo::new();
    let mut trie = ELTrie::new();
    for f in fact(&mut rodeo, ".conditions.[ .a.b.$x?, ~.d.e ]").expand() {
        assert!(trie.push(&f).is_success());
    }
    let q = fact(&mut rodeo, ".conditions?");
    let node = trie.query(&q).unwrap().nodes()[0];
    let facts = trie.leaf_facts(node);
    let rendered: Vec<String> = facts.iter().map(|f| f.render(&rodeo)).collect();
    assert_eq!(rendered.len(), 2);
    assert!(rendered.contains(&".a.b.$x?".to_string()));
    assert!(rendered.contains(&"~.d.e".to_string()));
}
