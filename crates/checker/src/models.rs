//! Built-in memory models.

use crate::mcm::{Axiom, BaseRelation, EventSet, Mcm, RelExpr};

pub const BUILTIN_MODELS: [&str; 4] = ["sc", "tso", "ra", "coherence"];

fn base(rel: BaseRelation) -> RelExpr {
    RelExpr::base(rel)
}

fn named(name: &str) -> RelExpr {
    RelExpr::named(name)
}

/// Relations shared by every built-in model.
fn with_common(mcm: Mcm) -> Mcm {
    mcm.with_relation(
        "com",
        base(BaseRelation::Rf)
            .union(base(BaseRelation::Co))
            .union(base(BaseRelation::Fr)),
    )
    .with_relation("po-loc", base(BaseRelation::Po).inter(base(BaseRelation::Loc)))
    .with_relation("rfe", base(BaseRelation::Rf).inter(base(BaseRelation::Ext)))
}

fn sc_per_location() -> Axiom {
    Axiom::acyclic("sc-per-location", named("po-loc").union(named("com")))
}

/// Sequential consistency.
pub fn sc() -> Mcm {
    with_common(Mcm::new("sc")).with_axiom(Axiom::acyclic(
        "sc",
        base(BaseRelation::Po).union(named("com")),
    ))
}

/// Total store order: write-to-read program order is relaxed and a thread
/// may read its own writes early.
pub fn tso() -> Mcm {
    with_common(Mcm::new("tso"))
        .with_relation(
            "ppo",
            base(BaseRelation::Po).diff(RelExpr::Product(EventSet::Writes, EventSet::Reads)),
        )
        .with_axiom(sc_per_location())
        .with_axiom(Axiom::acyclic(
            "tso",
            named("ppo")
                .union(named("rfe"))
                .union(base(BaseRelation::Co))
                .union(base(BaseRelation::Fr)),
        ))
}

/// Release/acquire: happens-before is `(po | rf)+` and must not contradict
/// the extended coherence order.
pub fn ra() -> Mcm {
    with_common(Mcm::new("ra"))
        .with_relation("hb", base(BaseRelation::Po).union(base(BaseRelation::Rf)).plus())
        .with_relation("eco", named("com").plus())
        .with_axiom(sc_per_location())
        .with_axiom(Axiom::irreflexive(
            "ra-coherence",
            named("hb").seq(named("eco").optional()),
        ))
}

/// Coherence only: per-location sequential consistency.
pub fn coherence() -> Mcm {
    with_common(Mcm::new("coherence")).with_axiom(sc_per_location())
}

pub fn by_name(name: &str) -> Option<Mcm> {
    match name.to_ascii_lowercase().as_str() {
        "sc" => Some(sc()),
        "tso" => Some(tso()),
        "ra" => Some(ra()),
        "coherence" | "coh" => Some(coherence()),
        _ => None,
    }
}
