//! Negation and optional term semantics.

use rulog::{Attribute, Entity, Rule, Store, Term};

#[test]
fn test_not_excludes_matching_entities() {
    let mut store = Store::new();
    let a = store.named("A");
    let b = store.named("B");
    store.set_attribute(a, Attribute::Final);
    store.set_attribute(b, Attribute::Final);

    let e1 = store.spawn();
    let e2 = store.spawn();
    store.add(e1, a);
    store.add(e2, a);
    store.add(e1, b);

    // A(.), !B(.)
    let rule = Rule::new(&store, vec![Term::new(a), Term::new(b).not()]).unwrap();

    let mut it = rule.iter(&store);
    assert!(it.next());
    assert_eq!(it.entities(), &[e2]);
    assert!(!it.next());
}

#[test]
fn test_not_with_no_matches_passes_everything() {
    let mut store = Store::new();
    let a = store.named("A");
    let b = store.named("B");
    store.set_attribute(a, Attribute::Final);
    store.set_attribute(b, Attribute::Final);

    let e1 = store.spawn();
    store.add(e1, a);

    let rule = Rule::new(&store, vec![Term::new(a), Term::new(b).not()]).unwrap();

    let mut it = rule.iter(&store);
    assert!(it.next());
    assert_eq!(it.entities(), &[e1]);
    assert!(!it.next());
}

#[test]
fn test_not_pair_with_bound_object_variable() {
    let mut store = Store::new();
    let likes = store.named("Likes");
    let fears = store.named("Fears");
    store.set_attribute(likes, Attribute::Final);
    store.set_attribute(fears, Attribute::Final);

    let cat = store.named("Cat");
    let dog = store.named("Dog");
    let alice = store.named("Alice");
    let bob = store.named("Bob");
    store.add_pair(alice, likes, cat);
    store.add_pair(alice, fears, cat);
    store.add_pair(bob, likes, dog);

    // Likes(., _Animal), !Fears(., _Animal): liking without fearing.
    let rule = Rule::new(
        &store,
        vec![
            Term::new(likes).object("_Animal"),
            Term::new(fears).object("_Animal").not(),
        ],
    )
    .unwrap();
    let animal = rule.find_var("_Animal").unwrap();

    let mut it = rule.iter(&store);
    assert!(it.next());
    assert_eq!(it.entities(), &[bob]);
    assert_eq!(it.get_var(animal), dog);
    assert!(!it.next());
}

#[test]
fn test_optional_term_binds_when_present() {
    let mut store = Store::new();
    let a = store.named("A");
    let likes = store.named("Likes");
    store.set_attribute(a, Attribute::Final);
    store.set_attribute(likes, Attribute::Final);

    let cat = store.named("Cat");
    let e1 = store.spawn();
    let e2 = store.spawn();
    store.add(e1, a);
    store.add(e2, a);
    store.add_pair(e1, likes, cat);

    // A(.), ?Likes(., _What)
    let rule = Rule::new(
        &store,
        vec![
            Term::new(a),
            Term::new(likes).object("_What").optional(),
        ],
    )
    .unwrap();
    let what = rule.find_var("_What").unwrap();

    let mut results = Vec::new();
    let mut it = rule.iter(&store);
    while it.next() {
        results.push((it.entities()[0], it.get_var(what)));
    }

    // Both tagged entities are yielded; the variable binds only where the
    // optional term matched and stays a wildcard otherwise.
    results.sort();
    let mut expected = vec![(e1, cat), (e2, Entity::WILDCARD)];
    expected.sort();
    assert_eq!(results, expected);
}

#[test]
fn test_optional_does_not_filter() {
    let mut store = Store::new();
    let a = store.named("A");
    let b = store.named("B");
    store.set_attribute(a, Attribute::Final);
    store.set_attribute(b, Attribute::Final);

    let e1 = store.spawn();
    let e2 = store.spawn();
    store.add(e1, a);
    store.add(e2, a);
    store.add(e2, b);

    // A(.), ?B(.): the optional term eliminates nothing.
    let rule = Rule::new(&store, vec![Term::new(a), Term::new(b).optional()]).unwrap();

    let mut matched = Vec::new();
    let mut it = rule.iter(&store);
    while it.next() {
        matched.extend_from_slice(it.entities());
    }
    matched.sort();
    let mut expected = vec![e1, e2];
    expected.sort();
    assert_eq!(matched, expected);
}
