use serde::Serialize;

use crate::node::NodeId;

/// Smallest and largest explicit order position covered by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub min: usize,
    pub max: usize,
}

impl Span {
    pub fn at(position: usize) -> Self {
        Self {
            min: position,
            max: position,
        }
    }

    pub fn union(self, other: Span) -> Span {
        Span {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

fn widen(span: Option<Span>, other: Option<Span>) -> Option<Span> {
    match (span, other) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, b) => a.or(b),
    }
}

/// Names one segment of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SegmentRef {
    pub owner: NodeId,
    pub index: usize,
}

/// Contiguous run of a group's descendants sharing one setup/teardown cycle.
///
/// `span == None` means no member has an explicit position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub owner: NodeId,
    pub members: Vec<SegmentRef>,
    pub span: Option<Span>,
}

impl Segment {
    pub fn new(owner: NodeId, index: usize, span: Option<Span>) -> Self {
        Self {
            index,
            owner,
            members: Vec::new(),
            span,
        }
    }

    pub fn reference(&self) -> SegmentRef {
        SegmentRef {
            owner: self.owner.clone(),
            index: self.index,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.span.is_some()
    }
}

/// Partition a group's child segments into the fewest contiguous segments
/// consistent with the runnable order.
///
/// `child_segments` lists every segment of every child, children in the
/// order they will run. Explicit segments are stable-sorted by `min` and run
/// first; unspecified ones follow in their original order. A new segment
/// starts when two consecutive explicit elements leave a gap of more than one
/// position, which means other work was ordered between them.
pub fn segment_children<'a, I>(
    owner: &NodeId,
    own_position: Option<usize>,
    child_segments: I,
) -> Vec<Segment>
where
    I: IntoIterator<Item = &'a Segment>,
{
    let (mut explicit, unspecified): (Vec<&Segment>, Vec<&Segment>) =
        child_segments.into_iter().partition(|s| s.is_explicit());
    explicit.sort_by_key(|s| s.span.map(|span| span.min));

    let mut result = vec![Segment::new(owner.clone(), 0, own_position.map(Span::at))];
    let mut last_max: Option<usize> = None;

    for child in explicit.into_iter().chain(unspecified) {
        let boundary = match (last_max, child.span) {
            (Some(last), Some(span)) => last + 1 < span.min,
            _ => false,
        };
        if boundary {
            result.push(Segment::new(owner.clone(), result.len(), None));
        }

        if let Some(current) = result.last_mut() {
            current.members.push(child.reference());
            current.span = widen(current.span, child.span);
        }
        last_max = child.span.map(|span| span.max);
    }

    result
}
