use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LayoutError;
use Shape::{Across, Along, Leaf};

/// Closed catalog of band partition topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rule {
    O,
    A,
    B,
    C,
    D,
    E1,
    E2,
    F1,
    F2,
    G,
    H,
    I,
}

impl Rule {
    pub const ALL: [Rule; 12] = [
        Rule::O,
        Rule::A,
        Rule::B,
        Rule::C,
        Rule::D,
        Rule::E1,
        Rule::E2,
        Rule::F1,
        Rule::F2,
        Rule::G,
        Rule::H,
        Rule::I,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::O => "O",
            Rule::A => "A",
            Rule::B => "B",
            Rule::C => "C",
            Rule::D => "D",
            Rule::E1 => "E1",
            Rule::E2 => "E2",
            Rule::F1 => "F1",
            Rule::F2 => "F2",
            Rule::G => "G",
            Rule::H => "H",
            Rule::I => "I",
        }
    }

    pub fn descriptor(self) -> &'static RuleDescriptor {
        // CATALOG is laid out in `Rule::ALL` order.
        &CATALOG[self as usize]
    }

    /// Fillers that must be found for the rule to succeed.
    pub fn required_fillers(self) -> usize {
        self.descriptor().required_fillers
    }

    /// Leaf panels including the main panel.
    pub fn panel_count(self) -> usize {
        1 + self.descriptor().sub.leaf_count()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Rule::ALL
            .iter()
            .copied()
            .find(|rule| rule.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| LayoutError::UnknownRule(token.to_string()))
    }
}

/// Parse a comma separated rule list such as `"A, I"`.
pub fn parse_rule_list(input: &str) -> Result<Vec<Rule>, LayoutError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Rule::from_str)
        .collect()
}

/// Placement of the main panel relative to the sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Main panel and sub-region share the band's main axis.
    Beside,
    /// Main panel stacked across the main axis, above (or left of) the sub-region.
    Stacked,
}

/// Sub-region topology in band-local axes. Leaves carry their panel letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Leaf(char),
    /// Children laid out along the band's main axis.
    Along(&'static [Shape]),
    /// Children laid out across the band's main axis.
    Across(&'static [Shape]),
}

impl Shape {
    pub fn leaf_count(&self) -> usize {
        match self {
            Shape::Leaf(_) => 1,
            Shape::Along(children) | Shape::Across(children) => {
                children.iter().map(Shape::leaf_count).sum()
            }
        }
    }

    pub fn letters(&self) -> Vec<char> {
        match self {
            Shape::Leaf(letter) => vec![*letter],
            Shape::Along(children) | Shape::Across(children) => {
                children.iter().flat_map(Shape::letters).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RuleDescriptor {
    pub rule: Rule,
    pub arrangement: Arrangement,
    pub sub: Shape,
    pub required_fillers: usize,
    /// The sub-region may stay empty (the band then counts as underfilled).
    pub optional_companion: bool,
}

const fn descriptor(
    rule: Rule,
    arrangement: Arrangement,
    sub: Shape,
    required_fillers: usize,
) -> RuleDescriptor {
    RuleDescriptor {
        rule,
        arrangement,
        sub,
        required_fillers,
        optional_companion: false,
    }
}

static CATALOG: [RuleDescriptor; 12] = [
    RuleDescriptor {
        rule: Rule::O,
        arrangement: Arrangement::Beside,
        sub: Leaf('B'),
        required_fillers: 0,
        optional_companion: true,
    },
    descriptor(Rule::A, Arrangement::Beside, Leaf('B'), 1),
    descriptor(Rule::B, Arrangement::Beside, Across(&[Leaf('B'), Leaf('C')]), 2),
    descriptor(Rule::C, Arrangement::Beside, Along(&[Leaf('B'), Leaf('C')]), 2),
    descriptor(
        Rule::D,
        Arrangement::Beside,
        Across(&[Leaf('B'), Leaf('C'), Leaf('D')]),
        3,
    ),
    descriptor(
        Rule::E1,
        Arrangement::Beside,
        Across(&[Along(&[Leaf('B'), Leaf('C')]), Along(&[Leaf('D'), Leaf('E')])]),
        4,
    ),
    descriptor(
        Rule::E2,
        Arrangement::Beside,
        Along(&[Across(&[Leaf('B'), Leaf('D')]), Across(&[Leaf('C'), Leaf('E')])]),
        4,
    ),
    descriptor(
        Rule::F1,
        Arrangement::Beside,
        Across(&[Leaf('B'), Along(&[Leaf('C'), Leaf('D')])]),
        3,
    ),
    descriptor(
        Rule::F2,
        Arrangement::Beside,
        Across(&[Along(&[Leaf('B'), Leaf('C')]), Leaf('D')]),
        3,
    ),
    descriptor(
        Rule::G,
        Arrangement::Beside,
        Along(&[Across(&[Leaf('B'), Leaf('C')]), Leaf('D')]),
        3,
    ),
    descriptor(Rule::H, Arrangement::Stacked, Along(&[Leaf('B'), Leaf('C')]), 2),
    descriptor(Rule::I, Arrangement::Stacked, Leaf('B'), 1),
];
