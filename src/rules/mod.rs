//! Subdivision-rule lookup.
//!
//! The engine consumes rules as a read-only service: `lookup` maps a
//! (shape, bit pattern) pair to a rule, `rule` resolves a mark, and the
//! pattern of a mark is the rule's own pattern. The table is built once at
//! startup: the 2-D sets and the red/copy templates are written as data
//! ([`tables`]), the tetrahedral closure set is generated from face
//! triangulations ([`generate`]).
//!
//! Rule ids are uniform across shapes: rule 0 is "no refinement", rule 1
//! the copy, rule 2 the full regular subdivision; everything after that is
//! shape specific.
//!
//! A rule names its child corners as *context slots*: slots `0..C` are the
//! corner son nodes, `C..C+E` the edge mid-nodes, `C+E..C+E+S` the face
//! nodes and the last slot the center (`C`, `E`, `S` per shape tables).

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use smallvec::SmallVec;

use crate::mesh_error::RefineError;
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::shape::ElementShape;

mod generate;
mod tables;

/// Mark of the copy rule (one unchanged child), any shape.
pub const COPY_MARK: MarkId = MarkId(1);
/// Mark of the full regular subdivision, any shape.
pub const FULL_MARK: MarkId = MarkId(2);

/// Neighbor entry of a rule child side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonNeighbor {
    /// Interior face shared with the given sibling.
    Sibling(u8),
    /// Exterior face lying on the given side of the father.
    FatherSide(u8),
}

/// One child of a subdivision rule.
#[derive(Debug, Clone)]
pub struct SonRule {
    pub shape: ElementShape,
    /// Context slots supplying the child corners, in reference order.
    pub corners: SmallVec<[u8; 8]>,
    /// One entry per child side, aligned with the child shape's sides.
    pub neighbors: SmallVec<[SonNeighbor; 6]>,
}

/// A subdivision rule for one shape.
#[derive(Debug, Clone)]
pub struct Rule {
    pub mark: MarkId,
    /// Class the rule implies when an element adopts it: `Red` for the
    /// full subdivision, `Green` for irregular closures, `Yellow` for the
    /// copy, `None` for rule 0.
    pub class: ElementClass,
    /// Edge bits, then (3-D) side bits shifted past the edges.
    pub pattern: u32,
    pub sons: Vec<SonRule>,
    /// Bitmask over context slots used by any son.
    slot_mask: u32,
}

impl Rule {
    /// Whether any son corner uses context slot `slot`.
    #[inline]
    pub fn uses_slot(&self, slot: usize) -> bool {
        self.slot_mask & (1 << slot) != 0
    }

    /// Whether the rule bisects local edge `edge` of `shape`.
    #[inline]
    pub fn bisects_edge(&self, shape: ElementShape, edge: usize) -> bool {
        edge < shape.edge_count() && self.pattern & (1 << edge) != 0
    }

    /// Whether the rule places a face node on side `side` of `shape`.
    #[inline]
    pub fn places_face_node(&self, shape: ElementShape, side: usize) -> bool {
        self.pattern & (1 << (shape.edge_count() + side)) != 0
    }

    /// Whether the rule uses the center slot of `shape`.
    #[inline]
    pub fn uses_center(&self, shape: ElementShape) -> bool {
        self.uses_slot(shape.center_slot())
    }

    /// The `(son, son side)` pairs lying on father side `side`.
    pub fn sons_on_father_side(&self, side: usize) -> SmallVec<[(u8, u8); 8]> {
        let mut out = SmallVec::new();
        for (i, son) in self.sons.iter().enumerate() {
            for (j, nb) in son.neighbors.iter().enumerate() {
                if *nb == SonNeighbor::FatherSide(side as u8) {
                    out.push((i as u8, j as u8));
                }
            }
        }
        out
    }
}

/// The rules of one shape plus the pattern index.
#[derive(Debug, Default)]
struct ShapeRules {
    rules: Vec<Rule>,
    by_pattern: HashMap<u32, MarkId>,
}

impl ShapeRules {
    fn push(&mut self, rule: Rule) {
        debug_assert_eq!(rule.mark.0 as usize, self.rules.len());
        // Rule 0 and the copy share pattern 0; derivation must resolve
        // pattern 0 to "no refinement", so first writer wins.
        self.by_pattern.entry(rule.pattern).or_insert(rule.mark);
        self.rules.push(rule);
    }
}

/// The complete rule table over all six shapes.
#[derive(Debug)]
pub struct RuleSet {
    shapes: [ShapeRules; 6],
}

fn shape_index(shape: ElementShape) -> usize {
    match shape {
        ElementShape::Triangle => 0,
        ElementShape::Quadrilateral => 1,
        ElementShape::Tetrahedron => 2,
        ElementShape::Pyramid => 3,
        ElementShape::Prism => 4,
        ElementShape::Hexahedron => 5,
    }
}

static RULES: Lazy<RuleSet> = Lazy::new(RuleSet::construct);

impl RuleSet {
    /// The process-wide table, built on first use.
    pub fn global() -> &'static RuleSet {
        &RULES
    }

    fn construct() -> RuleSet {
        let mut shapes: [ShapeRules; 6] = Default::default();
        for shape in crate::topology::shape::ALL_SHAPES {
            let bucket = &mut shapes[shape_index(shape)];
            for rule in tables::base_rules(shape) {
                bucket.push(rule);
            }
            if shape == ElementShape::Tetrahedron {
                let next = bucket.rules.len() as u16;
                for rule in generate::tetrahedron_closure_rules(next) {
                    bucket.push(rule);
                }
            }
        }
        RuleSet { shapes }
    }

    /// The rule matching `pattern` exactly, if the shape's set has one.
    pub fn lookup(&self, shape: ElementShape, pattern: u32) -> Option<&Rule> {
        let bucket = &self.shapes[shape_index(shape)];
        bucket
            .by_pattern
            .get(&pattern)
            .map(|m| &bucket.rules[m.0 as usize])
    }

    /// The rule behind a mark.
    pub fn rule(&self, shape: ElementShape, mark: MarkId) -> Result<&Rule, RefineError> {
        self.shapes[shape_index(shape)]
            .rules
            .get(mark.0 as usize)
            .ok_or(RefineError::RuleNotFound {
                shape,
                pattern: mark.0 as u32,
            })
    }

    /// The bit pattern a mark stands for.
    pub fn mark_to_pattern(&self, shape: ElementShape, mark: MarkId) -> Result<u32, RefineError> {
        Ok(self.rule(shape, mark)?.pattern)
    }

    /// The mark whose rule matches `pattern` exactly.
    pub fn pattern_to_mark(&self, shape: ElementShape, pattern: u32) -> Option<MarkId> {
        self.shapes[shape_index(shape)]
            .by_pattern
            .get(&pattern)
            .copied()
    }

    /// Number of rules carried for `shape`.
    pub fn rule_count(&self, shape: ElementShape) -> usize {
        self.shapes[shape_index(shape)].rules.len()
    }
}

/// Assembles a rule from its son corner lists: derives the bit pattern
/// from the slots in use, pairs interior son sides, and resolves exterior
/// son sides against the father sides.
///
/// Also serves the green path, which assembles a per-element family the
/// same way; an unmatched son side is reported rather than asserted.
pub(crate) fn build_rule(
    shape: ElementShape,
    mark: MarkId,
    class: ElementClass,
    sons: &[(ElementShape, &[u8])],
) -> Result<Rule, RefineError> {
    let mut slot_mask = 0u32;
    for (_, corners) in sons {
        for &slot in *corners {
            slot_mask |= 1 << slot;
        }
    }
    let mut pattern = 0u32;
    for e in 0..shape.edge_count() {
        if slot_mask & (1 << shape.edge_slot(e)) != 0 {
            pattern |= 1 << e;
        }
    }
    if shape.dimension() == 3 {
        for s in 0..shape.side_count() {
            if slot_mask & (1 << shape.side_slot(s)) != 0 {
                pattern |= 1 << (shape.edge_count() + s);
            }
        }
    }

    // Slot sets of the father sides: side corners, their edge mids, the
    // face node. A son side lying fully inside one of these is exterior.
    let father_sides: Vec<Vec<u8>> = (0..shape.side_count())
        .map(|s| {
            let mut set: Vec<u8> = shape.corners_of_side(s).to_vec();
            set.extend(
                shape
                    .edges_of_side(s)
                    .iter()
                    .map(|&e| shape.edge_slot(e as usize) as u8),
            );
            set.push(shape.side_slot(s) as u8);
            set
        })
        .collect();

    let side_slots = |son: &(ElementShape, &[u8]), side: usize| -> Vec<u8> {
        let mut slots: Vec<u8> = son
            .0
            .corners_of_side(side)
            .iter()
            .map(|&c| son.1[c as usize])
            .collect();
        slots.sort_unstable();
        slots
    };

    let mut built = Vec::with_capacity(sons.len());
    for (i, son) in sons.iter().enumerate() {
        let mut neighbors: SmallVec<[SonNeighbor; 6]> = SmallVec::new();
        for side in 0..son.0.side_count() {
            let key = side_slots(son, side);
            let sibling = sons.iter().enumerate().find(|(j, other)| {
                *j != i
                    && (0..other.0.side_count()).any(|os| side_slots(other, os) == key)
            });
            let entry = if let Some((j, _)) = sibling {
                SonNeighbor::Sibling(j as u8)
            } else {
                let father = father_sides
                    .iter()
                    .position(|fs| key.iter().all(|slot| fs.contains(slot)))
                    .ok_or(RefineError::SonTopology {
                        shape,
                        son: i,
                        side,
                    })?;
                SonNeighbor::FatherSide(father as u8)
            };
            neighbors.push(entry);
        }
        built.push(SonRule {
            shape: son.0,
            corners: SmallVec::from_slice(son.1),
            neighbors,
        });
    }

    Ok(Rule {
        mark,
        class,
        pattern,
        sons: built,
        slot_mask,
    })
}
