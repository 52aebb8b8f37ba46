//! Priority model.
//!
//! A priority is a `(category, sequence)` pair. Categories rank where a value
//! came from; sequences order values within a category. A locked priority
//! stops advancing so everything parsed from one expansion shares the slot
//! of the option that triggered it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse rank of where an option value came from, lowest first.
///
/// # Examples
///
/// ```
/// use option_precedence_engine::PriorityCategory;
///
/// assert!(PriorityCategory::CommandLine > PriorityCategory::RcFile);
/// assert_eq!("rc-file".parse::<PriorityCategory>().unwrap(), PriorityCategory::RcFile);
/// assert_eq!(PriorityCategory::InvocationPolicy.to_string(), "invocation-policy");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityCategory {
    /// Schema defaults. Values are never set at this category.
    Default,
    /// Defaults computed by the embedding program.
    ComputedDefault,
    /// Configuration files.
    RcFile,
    /// The user's command line.
    CommandLine,
    /// Policy applied on top of the command line.
    InvocationPolicy,
    /// Values the program itself requires.
    SoftwareRequirement,
}

impl PriorityCategory {
    /// Number of categories.
    pub const COUNT: usize = 6;

    /// All categories, lowest first.
    pub const ALL: [PriorityCategory; Self::COUNT] = [
        PriorityCategory::Default,
        PriorityCategory::ComputedDefault,
        PriorityCategory::RcFile,
        PriorityCategory::CommandLine,
        PriorityCategory::InvocationPolicy,
        PriorityCategory::SoftwareRequirement,
    ];

    /// Dense index, usable for per-category arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ComputedDefault => "computed-default",
            Self::RcFile => "rc-file",
            Self::CommandLine => "command-line",
            Self::InvocationPolicy => "invocation-policy",
            Self::SoftwareRequirement => "software-requirement",
        }
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown priority category: {s}"))
    }
}

/// Position of one occurrence in the override order.
///
/// Ordering and equality consider only `(category, sequence)`; the lock
/// flag only changes how [`next`](OptionPriority::next) behaves.
///
/// # Examples
///
/// ```
/// use option_precedence_engine::{OptionPriority, PriorityCategory};
///
/// let p = OptionPriority::lowest(PriorityCategory::CommandLine);
/// assert!(p.next() > p);
///
/// let locked = p.locked();
/// assert_eq!(locked.next(), p);
/// assert!(OptionPriority::lowest(PriorityCategory::InvocationPolicy) > p.next().next());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OptionPriority {
    category: PriorityCategory,
    sequence: u64,
    locked: bool,
}

impl OptionPriority {
    /// First priority of `category`.
    pub fn lowest(category: PriorityCategory) -> Self {
        Self::at(category, 0)
    }

    /// A specific unlocked priority.
    pub fn at(category: PriorityCategory, sequence: u64) -> Self {
        Self {
            category,
            sequence,
            locked: false,
        }
    }

    /// Priority category.
    pub fn category(&self) -> PriorityCategory {
        self.category
    }

    /// Sequence within the category.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether [`next`](OptionPriority::next) is frozen.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The priority for the next sibling token; unchanged when locked.
    pub fn next(self) -> Self {
        if self.locked {
            self
        } else {
            Self {
                sequence: self.sequence + 1,
                ..self
            }
        }
    }

    /// The same slot, frozen.
    pub fn locked(self) -> Self {
        Self {
            locked: true,
            ..self
        }
    }
}

impl PartialEq for OptionPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OptionPriority {}

impl PartialOrd for OptionPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OptionPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl fmt::Display for OptionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.sequence)
    }
}

/// Per-category high-water marks of one parser instance.
///
/// Each entry is the first priority not yet handed out in its category.
#[derive(Debug, Clone)]
pub(crate) struct PriorityTable {
    next: [OptionPriority; PriorityCategory::COUNT],
}

impl PriorityTable {
    pub(crate) fn new() -> Self {
        Self {
            next: PriorityCategory::ALL.map(OptionPriority::lowest),
        }
    }

    pub(crate) fn current(&self, category: PriorityCategory) -> OptionPriority {
        self.next[category.index()]
    }

    /// Never moves a mark backwards.
    pub(crate) fn advance(&mut self, priority: OptionPriority) {
        let slot = &mut self.next[priority.category().index()];
        if priority > *slot {
            *slot = OptionPriority::at(priority.category(), priority.sequence());
        }
    }
}
