//! Term model: the parsed form of a rule.
//!
//! A term has three positions (predicate, subject, object), each either a
//! fixed entity or a named variable. Terms are built with a fluent API;
//! expression parsing into terms is a separate concern and not part of
//! this crate.

use crate::id::{Entity, Id};

/// One position of a term: a fixed entity or a named variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermRef {
    Entity(Entity),
    Var(String),
}

impl TermRef {
    /// A variable reference. "This" is an alias of "." and both resolve to
    /// the same implicit subject variable.
    pub fn var(name: impl Into<String>) -> TermRef {
        let name = name.into();
        if name == "This" {
            TermRef::Var(".".to_string())
        } else {
            TermRef::Var(name)
        }
    }

    pub(crate) fn var_name(&self) -> Option<&str> {
        match self {
            TermRef::Var(name) => Some(name),
            TermRef::Entity(_) => None,
        }
    }

    pub(crate) fn entity(&self) -> Option<Entity> {
        match self {
            TermRef::Entity(e) => Some(*e),
            TermRef::Var(_) => None,
        }
    }

    pub(crate) fn is_var(&self) -> bool {
        matches!(self, TermRef::Var(_))
    }

    /// The builtin "this" entity in a position means the implicit subject
    /// variable.
    fn normalized(self) -> TermRef {
        match self {
            TermRef::Entity(e) if e == Entity::THIS => TermRef::Var(".".to_string()),
            other => other,
        }
    }
}

impl From<Entity> for TermRef {
    fn from(e: Entity) -> TermRef {
        TermRef::Entity(e)
    }
}

impl From<&str> for TermRef {
    fn from(name: &str) -> TermRef {
        TermRef::var(name)
    }
}

/// Term modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermOper {
    #[default]
    And,
    Not,
    Optional,
}

/// One constraint of a rule: `pred(subject)` or `pred(subject, object)`.
///
/// The subject defaults to the implicit "." variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub pred: TermRef,
    pub subject: TermRef,
    pub object: Option<TermRef>,
    pub oper: TermOper,
}

impl Term {
    pub fn new(pred: impl Into<TermRef>) -> Term {
        Term {
            pred: pred.into().normalized(),
            subject: TermRef::var("."),
            object: None,
            oper: TermOper::And,
        }
    }

    pub fn subject(mut self, subject: impl Into<TermRef>) -> Term {
        self.subject = subject.into().normalized();
        self
    }

    pub fn object(mut self, object: impl Into<TermRef>) -> Term {
        self.object = Some(object.into().normalized());
        self
    }

    pub fn oper(mut self, oper: TermOper) -> Term {
        self.oper = oper;
        self
    }

    pub fn not(self) -> Term {
        self.oper(TermOper::Not)
    }

    pub fn optional(self) -> Term {
        self.oper(TermOper::Optional)
    }

    /// The term's filter id, with variables replaced by the wildcard.
    pub(crate) fn filter_id(&self) -> Id {
        let pred = self.pred.entity().unwrap_or(Entity::WILDCARD);
        match &self.object {
            Some(obj) => Id::pair(pred, obj.entity().unwrap_or(Entity::WILDCARD)),
            None => Id::single(pred),
        }
    }
}
