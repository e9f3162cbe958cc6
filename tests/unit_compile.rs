//! Unit tests for rule compilation: error cases, variable introspection
//! and program shapes.

use rulog::{Attribute, Rule, RuleError, Store, Term, TermRef};

#[test]
fn test_empty_rule() {
    let store = Store::new();
    let err = Rule::new(&store, vec![]).unwrap_err();
    assert_eq!(err, RuleError::NoTerms);
}

#[test]
fn test_only_not_terms() {
    let mut store = Store::new();
    let tag = store.named("Tag");
    let err = Rule::new(&store, vec![Term::new(tag).not()]).unwrap_err();
    assert_eq!(err, RuleError::OnlyNotTerms);
}

#[test]
fn test_unconstrained_variable() {
    let mut store = Store::new();
    let a = store.named("A");
    let b = store.named("B");

    // _X and _Y never co-occur; _Y is unreachable from the root.
    let err = Rule::new(
        &store,
        vec![
            Term::new(a).subject("_X"),
            Term::new(b).subject("_Y"),
        ],
    )
    .unwrap_err();
    assert_eq!(err, RuleError::UnconstrainedVariable("_Y".to_string()));
}

#[test]
fn test_too_many_variables() {
    let mut store = Store::new();
    let likes = store.named("Likes");
    store.set_attribute(likes, Attribute::Final);

    // Every term introduces a fresh object variable joined through the
    // implicit subject; together with the subject's own record this
    // crosses the variable cap.
    let terms: Vec<Term> = (0..257)
        .map(|i| Term::new(likes).object(TermRef::var(format!("_V{}", i))))
        .collect();

    let err = Rule::new(&store, terms).unwrap_err();
    assert_eq!(err, RuleError::TooManyVariables);
}

#[test]
fn test_missing_predicate_variable_in_not_term() {
    let mut store = Store::new();
    let a = store.named("A");

    let err = Rule::new(
        &store,
        vec![Term::new(a), Term::new("_Pred").not()],
    )
    .unwrap_err();
    assert_eq!(err, RuleError::MissingPredicateVariable("_Pred".to_string()));
}

#[test]
fn test_missing_object_variable_in_not_term() {
    let mut store = Store::new();
    let a = store.named("A");
    let likes = store.named("Likes");

    let err = Rule::new(
        &store,
        vec![Term::new(a), Term::new(likes).object("_Obj").not()],
    )
    .unwrap_err();
    assert_eq!(err, RuleError::MissingObjectVariable("_Obj".to_string()));
}

#[test]
fn test_not_term_with_declared_variables_compiles() {
    let mut store = Store::new();
    let a = store.named("A");
    let likes = store.named("Likes");
    store.set_attribute(a, Attribute::Final);
    store.set_attribute(likes, Attribute::Final);

    let rule = Rule::new(
        &store,
        vec![
            Term::new(likes).object("_Obj"),
            Term::new(likes).object("_Obj").not(),
        ],
    );
    assert!(rule.is_ok());
}

#[test]
fn test_variable_introspection() {
    let mut store = Store::new();
    let likes = store.named("Likes");
    store.set_attribute(likes, Attribute::Final);

    let rule = Rule::new(&store, vec![Term::new(likes).object("_Who")]).unwrap();

    // The implicit subject exists as a table variable only; _Who has an
    // entity record.
    let who = rule.find_var("_Who").expect("object variable");
    assert!(rule.var_is_entity(who));
    assert_eq!(rule.var_name(who), "_Who");
    assert!(rule.find_var("NoSuchVar").is_none());
    // "This" aliases "." and subject-only variables have no entity form.
    assert_eq!(rule.find_var("This"), rule.find_var("."));
}

#[test]
fn test_program_str_simple_pair() {
    let mut store = Store::new();
    let home = store.named("HomePlanet");
    let tatooine = store.named("Tatooine");
    store.set_attribute(home, Attribute::Final);

    let rule = Rule::new(&store, vec![Term::new(home).object(tatooine)]).unwrap();
    let program = rule.program_str(&store);

    // A final predicate with a concrete object compiles to a single
    // select plus the yield.
    assert_eq!(
        program,
        " 1: [S: 1, P: 2, F: 0] select   O:t. F:(HomePlanet, Tatooine)\n \
         2: [S: 2, P: 3, F: 1] yield    I:t. \n"
    );
}

#[test]
fn test_program_str_is_stable() {
    let mut store = Store::new();
    let home = store.named("HomePlanet");
    let tatooine = store.named("Tatooine");

    let rule = Rule::new(&store, vec![Term::new(home).object(tatooine)]).unwrap();
    assert_eq!(rule.program_str(&store), rule.program_str(&store));
}

#[test]
fn test_non_final_predicate_expands_through_inheritance() {
    let mut store = Store::new();
    let home = store.named("HomePlanet");
    let tatooine = store.named("Tatooine");

    let rule = Rule::new(&store, vec![Term::new(home).object(tatooine)]).unwrap();
    let program = rule.program_str(&store);

    // The predicate is substituted with an inclusive subset of the
    // inheritance relation rooted at it.
    assert!(program.contains("subset"), "program:\n{program}");
    assert!(program.contains("F:(IsA, HomePlanet)"), "program:\n{program}");
    assert!(program.contains("setjmp"), "program:\n{program}");
    assert!(program.contains("jump"), "program:\n{program}");
}

#[test]
fn test_transitive_object_query_compiles_to_superset() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    let bob = store.named("Bob");
    let sf = store.named("SanFrancisco");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);
    store.add_pair(bob, located_in, sf);

    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(bob).object("_Where")],
    )
    .unwrap();
    let program = rule.program_str(&store);
    assert!(program.contains("superset"), "program:\n{program}");
}

#[test]
fn test_transitive_subject_query_compiles_to_subset() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    let us = store.named("UnitedStates");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);

    let rule = Rule::new(&store, vec![Term::new(located_in).object(us)]).unwrap();
    let program = rule.program_str(&store);
    assert!(program.contains("subset"), "program:\n{program}");
}

#[test]
fn test_rule_shareable_across_iterators() {
    let mut store = Store::new();
    let tag = store.named("Tag");
    store.set_attribute(tag, Attribute::Final);
    let e = store.spawn();
    store.add(e, tag);

    let rule = Rule::new(&store, vec![Term::new(tag)]).unwrap();

    // Two iterators over the same compiled rule do not interfere.
    let mut a = rule.iter(&store);
    let mut b = rule.iter(&store);
    assert!(a.next());
    assert!(b.next());
    assert_eq!(a.entities(), &[e]);
    assert_eq!(b.entities(), &[e]);
    assert!(!a.next());
    assert!(!b.next());
}
