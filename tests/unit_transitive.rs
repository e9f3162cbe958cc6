//! Transitive relation traversal: subsets, supersets, inclusive
//! (reflexive) expansion and implicit inheritance of predicates.

use rulog::{Attribute, Entity, Rule, Store, Term};

/// The Star Wars fixture: an inheritance taxonomy (via the builtin IsA,
/// which is reflexive-transitive), instances attached to it, and a few
/// concrete relations.
struct Fixture {
    store: Store,
    home_planet: Entity,
    enemy: Entity,
    likes: Entity,
    character: Entity,
    human: Entity,
    droid: Entity,
    luke: Entity,
    leia: Entity,
    r2d2: Entity,
    c3po: Entity,
    tatooine: Entity,
    vader: Entity,
    han: Entity,
}

fn fixture() -> Fixture {
    let mut store = Store::new();
    let isa = Entity::ISA;

    let thing = store.named("Thing");
    let celestial = store.named("CelestialBody");
    let planet = store.named("Planet");
    let moon = store.named("Moon");
    let person = store.named("Person");
    let character = store.named("Character");
    let human = store.named("Human");
    let droid = store.named("Droid");

    let home_planet = store.named("HomePlanet");
    let enemy = store.named("Enemy");
    let likes = store.named("Likes");

    let luke = store.named("Luke");
    let leia = store.named("Leia");
    let r2d2 = store.named("R2D2");
    let c3po = store.named("C3PO");
    let tatooine = store.named("Tatooine");
    let alderaan = store.named("Alderaan");
    let vader = store.named("Vader");
    let han = store.named("HanSolo");

    store.add_pair(celestial, isa, thing);
    store.add_pair(planet, isa, celestial);
    store.add_pair(moon, isa, celestial);
    store.add_pair(person, isa, thing);
    store.add_pair(character, isa, person);
    store.add_pair(human, isa, character);
    store.add_pair(droid, isa, character);

    store.add_pair(luke, isa, human);
    store.add_pair(leia, isa, human);
    store.add_pair(r2d2, isa, droid);
    store.add_pair(c3po, isa, droid);

    store.add_pair(luke, home_planet, tatooine);
    store.add_pair(leia, home_planet, alderaan);
    store.add_pair(luke, enemy, vader);
    store.add_pair(leia, likes, han);
    store.add_pair(han, likes, leia);

    Fixture {
        store,
        home_planet,
        enemy,
        likes,
        character,
        human,
        droid,
        luke,
        leia,
        r2d2,
        c3po,
        tatooine,
        vader,
        han,
    }
}

/// Drain an iterator into the flattened list of matched entities.
fn collect_entities(rule: &Rule, store: &Store) -> Vec<Entity> {
    let mut it = rule.iter(store);
    let mut out = Vec::new();
    while it.next() {
        out.extend_from_slice(it.entities());
    }
    out
}

#[test]
fn test_find_this_with_pair() {
    let f = fixture();
    // HomePlanet(., Tatooine)
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.home_planet).object(f.tatooine)],
    )
    .unwrap();
    assert_eq!(collect_entities(&rule, &f.store), vec![f.luke]);
}

#[test]
fn test_two_pair_terms_bind_both_objects() {
    let f = fixture();
    // HomePlanet(., _X), Enemy(., _Y)
    let rule = Rule::new(
        &f.store,
        vec![
            Term::new(f.home_planet).object("_X"),
            Term::new(f.enemy).object("_Y"),
        ],
    )
    .unwrap();
    let x = rule.find_var("_X").unwrap();
    let y = rule.find_var("_Y").unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    assert_eq!(it.entities(), &[f.luke]);
    assert_eq!(it.get_var(x), f.tatooine);
    assert_eq!(it.get_var(y), f.vader);
    assert!(!it.next());
}

#[test]
fn test_inclusive_subsets_depth_first_order() {
    let f = fixture();
    // IsA(., Character): the reflexive root first, then the taxonomy and
    // its instances depth-first.
    let rule = Rule::new(
        &f.store,
        vec![Term::new(Entity::ISA).object(f.character)],
    )
    .unwrap();

    assert_eq!(
        collect_entities(&rule, &f.store),
        vec![f.character, f.human, f.droid, f.luke, f.leia, f.r2d2, f.c3po]
    );
}

#[test]
fn test_inclusive_subsets_self_is_first() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(Entity::ISA).object(f.human)],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    // The reflexive match precedes any proper subset.
    assert_eq!(it.entities(), &[f.human]);
    assert_eq!(it.count(), 1);
}

#[test]
fn test_mutual_likes_join() {
    let f = fixture();
    // Likes(., _X), Likes(_X, .)
    let rule = Rule::new(
        &f.store,
        vec![
            Term::new(f.likes).object("_X"),
            Term::new(f.likes).subject("_X").object("."),
        ],
    )
    .unwrap();
    let x = rule.find_var("_X").unwrap();

    let mut results = Vec::new();
    let mut it = rule.iter(&f.store);
    while it.next() {
        results.push((it.entities()[0], it.get_var(x)));
    }
    results.sort();
    let mut expected = vec![(f.leia, f.han), (f.han, f.leia)];
    expected.sort();
    assert_eq!(results, expected);
}

#[test]
fn test_transitive_fact_through_chain() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);

    let bob = store.named("Bob");
    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    let us = store.named("UnitedStates");
    store.add_pair(sf, located_in, ca);
    store.add_pair(ca, located_in, us);
    store.add_pair(bob, located_in, sf);

    // Direct fact.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(bob).object(sf)],
    )
    .unwrap();
    assert!(rule.iter(&store).next());

    // Two hops up the chain.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(bob).object(us)],
    )
    .unwrap();
    assert!(rule.iter(&store).next());

    // Not located in an unrelated place.
    let mars = store.named("Mars");
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(bob).object(mars)],
    )
    .unwrap();
    assert!(!rule.iter(&store).next());
}

#[test]
fn test_transitive_supersets_of_subject() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);

    let bob = store.named("Bob");
    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    let us = store.named("UnitedStates");
    store.add_pair(sf, located_in, ca);
    store.add_pair(ca, located_in, us);
    store.add_pair(bob, located_in, sf);

    // LocatedIn(Bob, _Where): every place along the chain.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(bob).object("_Where")],
    )
    .unwrap();
    let where_ = rule.find_var("_Where").unwrap();

    let mut places = Vec::new();
    let mut it = rule.iter(&store);
    while it.next() {
        places.push(it.get_var(where_));
    }
    assert_eq!(places, vec![sf, ca, us]);
}

#[test]
fn test_transitive_subsets_of_object() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);

    let bob = store.named("Bob");
    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    let us = store.named("UnitedStates");
    store.add_pair(sf, located_in, ca);
    store.add_pair(ca, located_in, us);
    store.add_pair(bob, located_in, sf);

    // LocatedIn(., UnitedStates): everything transitively inside.
    let rule = Rule::new(&store, vec![Term::new(located_in).object(us)]).unwrap();
    assert_eq!(collect_entities(&rule, &store), vec![ca, sf, bob]);
}

#[test]
fn test_reflexive_closure_yields_self_first() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::TransitiveSelf);
    store.set_attribute(located_in, Attribute::Final);

    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    store.add_pair(sf, located_in, ca);

    // LocatedIn(SanFrancisco, _Where) with a reflexive-transitive
    // predicate: the subject itself comes first.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(sf).object("_Where")],
    )
    .unwrap();
    let where_ = rule.find_var("_Where").unwrap();

    let mut places = Vec::new();
    let mut it = rule.iter(&store);
    while it.next() {
        places.push(it.get_var(where_));
    }
    assert_eq!(places, vec![sf, ca]);
}

#[test]
fn test_reflexive_fact_matches_itself() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::TransitiveSelf);
    store.set_attribute(located_in, Attribute::Final);

    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    store.add_pair(sf, located_in, ca);

    // LocatedIn(SanFrancisco, SanFrancisco) holds reflexively.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).subject(sf).object(sf)],
    )
    .unwrap();
    assert!(rule.iter(&store).next());
}

#[test]
fn test_implicit_inheritance_of_predicates() {
    let mut store = Store::new();
    let isa = Entity::ISA;
    let character = store.named("Character");
    let human = store.named("Human");
    store.add_pair(human, isa, character);

    let luke = store.named("Luke");
    store.add(luke, human);

    // Character(.): Human is a Character, so an entity with the Human
    // component matches through predicate substitution.
    let rule = Rule::new(&store, vec![Term::new(character)]).unwrap();
    assert_eq!(collect_entities(&rule, &store), vec![luke]);

    // With the predicate marked final, substitution is suppressed and
    // nothing carries the literal Character component.
    store.set_attribute(character, Attribute::Final);
    let rule = Rule::new(&store, vec![Term::new(character)]).unwrap();
    assert_eq!(collect_entities(&rule, &store), vec![]);
}

#[test]
fn test_implicit_inheritance_on_literal_subject() {
    let mut store = Store::new();
    let isa = Entity::ISA;
    let sentient = store.named("Sentient");
    let human = store.named("Human");
    let luke = store.named("Luke");
    store.set_attribute(sentient, Attribute::Final);

    // The Human prototype is sentient; Luke is a Human.
    store.add(human, sentient);
    store.add_pair(luke, isa, human);

    // Sentient(Luke) holds through Luke's inheritance chain.
    let rule = Rule::new(&store, vec![Term::new(sentient).subject(luke)]).unwrap();
    assert!(rule.iter(&store).next());

    // An entity outside the chain does not match.
    let jabba = store.named("Jabba");
    let rule = Rule::new(&store, vec![Term::new(sentient).subject(jabba)]).unwrap();
    assert!(!rule.iter(&store).next());
}

#[test]
fn test_transitive_both_sides_unknown() {
    let mut store = Store::new();
    let located_in = store.named("LocatedIn");
    store.set_attribute(located_in, Attribute::Transitive);
    store.set_attribute(located_in, Attribute::Final);

    let sf = store.named("SanFrancisco");
    let ca = store.named("California");
    let us = store.named("UnitedStates");
    store.add_pair(sf, located_in, ca);
    store.add_pair(ca, located_in, us);

    // LocatedIn(., _Where): each concrete relation expanded upward.
    let rule = Rule::new(
        &store,
        vec![Term::new(located_in).object("_Where")],
    )
    .unwrap();
    let where_ = rule.find_var("_Where").unwrap();

    let mut results = Vec::new();
    let mut it = rule.iter(&store);
    while it.next() {
        for &e in it.entities() {
            results.push((e, it.get_var(where_)));
        }
    }
    results.sort();
    let mut expected = vec![(sf, ca), (sf, us), (ca, us)];
    expected.sort();
    assert_eq!(results, expected);
}
