//! Fact queries: terms with literal subjects, evaluated as checks rather
//! than searches.

use rulog::{Attribute, Entity, Rule, Store, Term};

struct Fixture {
    store: Store,
    home_planet: Entity,
    enemy: Entity,
    luke: Entity,
    yoda: Entity,
    tatooine: Entity,
    dagobah: Entity,
    vader: Entity,
}

fn fixture() -> Fixture {
    let mut store = Store::new();
    let home_planet = store.named("HomePlanet");
    let enemy = store.named("Enemy");
    let luke = store.named("Luke");
    let yoda = store.named("Yoda");
    let tatooine = store.named("Tatooine");
    let dagobah = store.named("Dagobah");
    let vader = store.named("Vader");

    store.add_pair(luke, home_planet, tatooine);
    store.add_pair(luke, enemy, vader);
    store.add_pair(yoda, home_planet, dagobah);

    Fixture {
        store,
        home_planet,
        enemy,
        luke,
        yoda,
        tatooine,
        dagobah,
        vader,
    }
}

#[test]
fn test_1_fact_true() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.home_planet).subject(f.luke).object(f.tatooine)],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    // A fact query binds no table.
    assert!(it.table().is_none());
    assert!(it.entities().is_empty());
    assert!(!it.next());
}

#[test]
fn test_1_fact_false() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.home_planet).subject(f.luke).object(f.dagobah)],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(!it.next());
}

#[test]
fn test_2_facts_true() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![
            Term::new(f.home_planet).subject(f.yoda).object(f.dagobah),
            Term::new(f.home_planet).subject(f.luke).object(f.tatooine),
        ],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    assert!(!it.next());
}

#[test]
fn test_2_facts_1_false() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![
            Term::new(f.home_planet).subject(f.yoda).object(f.dagobah),
            Term::new(f.home_planet).subject(f.luke).object(f.dagobah),
        ],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(!it.next());
}

#[test]
fn test_fact_with_object_variable() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.enemy).subject(f.luke).object("_Who")],
    )
    .unwrap();
    let who = rule.find_var("_Who").unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    assert_eq!(it.get_var(who), f.vader);
    assert!(!it.next());
}

#[test]
fn test_fact_subject_resolved_in_snapshot() {
    let f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.home_planet).subject(f.luke).object(f.tatooine)],
    )
    .unwrap();

    let mut it = rule.iter(&f.store);
    assert!(it.next());
    // The term's resolved id is the concrete pair.
    assert_eq!(it.ids()[0], rulog::Id::pair(f.home_planet, f.tatooine));
}

#[test]
fn test_fact_on_despawned_subject_fails() {
    let mut f = fixture();
    let rule = Rule::new(
        &f.store,
        vec![Term::new(f.home_planet).subject(f.luke).object(f.tatooine)],
    )
    .unwrap();

    f.store.despawn(f.luke);

    // The stale handle fails liveness and the match degrades to a miss;
    // the iteration itself is not an error.
    let mut it = rule.iter(&f.store);
    assert!(!it.next());
}

#[test]
fn test_recycled_subject_does_not_match_old_facts() {
    let mut store = Store::new();
    let tag = store.named("Tag");
    store.set_attribute(tag, Attribute::Final);

    let e = store.spawn();
    store.add(e, tag);
    store.despawn(e);
    let recycled = store.spawn();
    assert_eq!(recycled.index(), e.index());

    // The recycled entity has no components; the old fact is gone.
    let rule = Rule::new(&store, vec![Term::new(tag).subject(recycled)]).unwrap();
    let mut it = rule.iter(&store);
    assert!(!it.next());
}

#[test]
fn test_wildcard_as_subject() {
    let mut store = Store::new();
    let tag = store.named("Tag");
    let child_of = store.named("ChildOf");
    store.set_attribute(tag, Attribute::Final);
    store.set_attribute(child_of, Attribute::Final);

    let e1 = store.spawn();
    let e2 = store.spawn();
    store.add(e1, tag);
    store.add(e2, tag);
    let child = store.spawn();
    store.add_pair(child, child_of, e1);

    // Tag(.), ChildOf(*, .) matches only the tagged entity that has a
    // child.
    let rule = Rule::new(
        &store,
        vec![
            Term::new(tag),
            Term::new(child_of)
                .subject(Entity::WILDCARD)
                .object("."),
        ],
    )
    .unwrap();

    let mut it = rule.iter(&store);
    assert!(it.next());
    assert_eq!(it.entities(), &[e1]);
    assert!(!it.next());
}
