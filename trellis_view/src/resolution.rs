// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared scale and axis state across the view tree.
//!
//! Each unit view announces its channel encodings after construction. The
//! announcement climbs the tree: it keeps ascending while the parent's policy
//! for that channel pulls participants together, and stops at the highest view
//! willing to share. The resolution living at that view then accumulates
//! domains (and axis titles) from every participant below it.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use trellis_core::{DomainArray, DomainType, Scalar, create_domain};

use crate::axis::AxisOverrides;
use crate::data::Accessor;
use crate::error::ViewError;
use crate::view::{Channel, ViewId, ViewTree};

/// How a container treats its descendants' scales or axes on a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Participants below this view merge into one resolution.
    #[default]
    Shared,
    /// Each child subtree resolves on its own.
    Independent,
    /// Descendants pass through; this view contributes nothing and joins
    /// nothing above it.
    Excluded,
}

impl ResolutionPolicy {
    /// Parses a policy name from a spec.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "shared" => Some(Self::Shared),
            "independent" => Some(Self::Independent),
            "excluded" => Some(Self::Excluded),
            _ => None,
        }
    }
}

/// Index of a [`ScaleResolution`] in the tree's arena.
pub type ScaleResolutionId = usize;

/// Index of an [`AxisResolution`] in the tree's arena.
pub type AxisResolutionId = usize;

/// One participant in a scale resolution.
#[derive(Clone, Debug)]
pub struct ScaleMember {
    /// The unit view that registered.
    pub view: ViewId,
    /// The channel it registered on.
    pub channel: Channel,
    /// How the view extracts values for the channel.
    pub accessor: Accessor,
    /// Explicit domain from the member's scale def, if any.
    pub explicit_domain: Option<Vec<Scalar>>,
}

/// A scale shared by one or more unit views on a channel.
///
/// The domain is not stored; it is computed on demand from the members'
/// collected data, so late-arriving data needs no invalidation bookkeeping
/// beyond layout.
#[derive(Clone, Debug, Default)]
pub struct ScaleResolution {
    /// The channel this resolution covers.
    pub channel: Option<Channel>,
    /// The agreed data type; set by the first member, checked by the rest.
    pub data_type: Option<DomainType>,
    /// Whether any member requested the domain to include zero.
    pub zero: bool,
    /// The registered participants.
    pub members: Vec<ScaleMember>,
}

impl ScaleResolution {
    /// Adds a member, establishing or checking the data type.
    ///
    /// The first member with a declared type fixes it; later members must
    /// agree. A member without a type is accepted but the resolution stays
    /// untyped until someone declares one.
    pub fn push_member(
        &mut self,
        member: ScaleMember,
        data_type: Option<DomainType>,
        zero: bool,
        path: &str,
    ) -> Result<(), ViewError> {
        self.channel = Some(member.channel);
        match (self.data_type, data_type) {
            (None, declared) => self.data_type = declared,
            (Some(expected), Some(actual)) if expected != actual => {
                return Err(ViewError::TypeMismatch {
                    path: path.into(),
                    channel: member.channel,
                    expected,
                    actual,
                });
            }
            _ => {}
        }
        self.zero = self.zero || zero;
        self.members.push(member);
        Ok(())
    }

    /// Computes the accumulated domain across all members.
    ///
    /// Returns `Ok(None)` while any member's collector is absent or still
    /// incomplete; the domain is undefined until every participant has data.
    /// Errors if no member ever declared a data type.
    pub fn domain(&self, tree: &ViewTree) -> Result<Option<DomainArray>, ViewError> {
        let Some(data_type) = self.data_type else {
            let Some(first) = self.members.first() else {
                return Ok(None);
            };
            return Err(ViewError::MissingDataType {
                path: tree.path(first.view),
                channel: first.channel,
            });
        };
        let mut domain = match data_type {
            // Piecewise domains cannot grow from empty; seed from the first
            // explicit stop list.
            DomainType::Piecewise => {
                let stops: Vec<f64> = self
                    .members
                    .iter()
                    .find_map(|m| m.explicit_domain.as_ref())
                    .map(|values| values.iter().filter_map(Scalar::as_f64).collect())
                    .unwrap_or_default();
                let path = self
                    .members
                    .first()
                    .map(|m| tree.path(m.view))
                    .unwrap_or_default();
                DomainArray::piecewise(stops)
                    .map_err(|source| ViewError::Domain { path, source })?
            }
            _ => create_domain(data_type),
        };
        for member in &self.members {
            let path = tree.path(member.view);
            let wrap = |source| ViewError::Domain {
                path: path.clone(),
                source,
            };
            if let Some(explicit) = &member.explicit_domain {
                domain
                    .extend_values(explicit.iter().cloned().map(Some))
                    .map_err(wrap)?;
                continue;
            }
            let Some(field) = member.accessor.field() else {
                continue;
            };
            let Some(group) = tree.collected_data(member.view) else {
                return Ok(None);
            };
            for datum in group.flat_data() {
                domain.extend_opt(datum.get(field).cloned()).map_err(wrap)?;
            }
        }
        // Zero inclusion only makes sense on a continuous interval.
        if self.zero && data_type == DomainType::Quantitative {
            domain
                .extend(Scalar::Number(0.0))
                .map_err(|source| ViewError::Domain {
                    path: String::new(),
                    source,
                })?;
        }
        Ok(Some(domain))
    }
}

/// One participant in an axis resolution.
#[derive(Clone, Debug)]
pub struct AxisMember {
    /// The unit view that registered.
    pub view: ViewId,
    /// The axis title this member contributes, already defaulted from the
    /// encoding title or field name.
    pub title: Option<String>,
    /// The member's axis property overrides.
    pub overrides: AxisOverrides,
}

/// An axis shared by one or more unit views on a positional channel.
#[derive(Clone, Debug, Default)]
pub struct AxisResolution {
    /// The channel this resolution covers.
    pub channel: Option<Channel>,
    /// The scale resolution this axis reads its domain from.
    pub scale: Option<ScaleResolutionId>,
    /// The registered participants, in registration order.
    pub members: Vec<AxisMember>,
}

impl AxisResolution {
    /// Adds a member.
    pub fn push_member(&mut self, member: AxisMember, channel: Channel) {
        self.channel = Some(channel);
        self.members.push(member);
    }

    /// The merged axis property overrides.
    ///
    /// For each property the first member that sets it wins, matching
    /// registration order. Titles are handled separately by [`Self::title`].
    pub fn merged_overrides(&self) -> AxisOverrides {
        let mut merged = AxisOverrides::default();
        for member in &self.members {
            merged.merge_missing(&member.overrides);
        }
        merged
    }

    /// The joined axis title.
    ///
    /// An explicit title on any member's axis def takes precedence; otherwise
    /// the members' distinct default titles are joined with `", "`.
    pub fn title(&self) -> Option<String> {
        if let Some(explicit) = self
            .members
            .iter()
            .find_map(|m| m.overrides.title.clone())
        {
            return Some(explicit);
        }
        let mut titles: Vec<&str> = Vec::new();
        for member in &self.members {
            if let Some(title) = &member.title
                && !titles.contains(&title.as_str())
            {
                titles.push(title);
            }
        }
        if titles.is_empty() {
            None
        } else {
            Some(titles.join(", "))
        }
    }
}

/// Walks up from `view`, returning the view at which a resolution for
/// `channel` should live.
///
/// The climb continues while the parent gathers participants (its policy is
/// shared or excluded) and the current view does not opt out with an
/// excluded policy of its own. An independent parent stops the climb, so the
/// resolution stays within the current subtree.
pub(crate) fn resolution_target(
    tree: &ViewTree,
    view: ViewId,
    channel: Channel,
    policy_of: impl Fn(&ViewTree, ViewId, Channel) -> ResolutionPolicy,
) -> ViewId {
    let mut current = view;
    loop {
        let Some(parent) = tree.parent(current) else {
            break;
        };
        if policy_of(tree, current, channel) == ResolutionPolicy::Excluded {
            break;
        }
        match policy_of(tree, parent, channel) {
            ResolutionPolicy::Independent => break,
            ResolutionPolicy::Shared | ResolutionPolicy::Excluded => current = parent,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn policy_names_parse() {
        assert_eq!(
            ResolutionPolicy::from_name("shared"),
            Some(ResolutionPolicy::Shared)
        );
        assert_eq!(
            ResolutionPolicy::from_name("independent"),
            Some(ResolutionPolicy::Independent)
        );
        assert_eq!(
            ResolutionPolicy::from_name("excluded"),
            Some(ResolutionPolicy::Excluded)
        );
        assert_eq!(ResolutionPolicy::from_name("mixed"), None);
    }

    #[test]
    fn titles_join_distinct_members() {
        let mut res = AxisResolution::default();
        for title in ["height", "height", "weight"] {
            res.push_member(
                AxisMember {
                    view: ViewId::from_raw(0),
                    title: Some(title.into()),
                    overrides: AxisOverrides::default(),
                },
                Channel::Y,
            );
        }
        assert_eq!(res.title().as_deref(), Some("height, weight"));
    }

    #[test]
    fn explicit_title_beats_joining() {
        let mut res = AxisResolution::default();
        res.push_member(
            AxisMember {
                view: ViewId::from_raw(0),
                title: Some("height".into()),
                overrides: AxisOverrides::default(),
            },
            Channel::Y,
        );
        let mut overridden = AxisOverrides::default();
        overridden.title = Some("Total".into());
        res.push_member(
            AxisMember {
                view: ViewId::from_raw(1),
                title: Some("weight".into()),
                overrides: overridden,
            },
            Channel::Y,
        );
        assert_eq!(res.title().as_deref(), Some("Total"));
    }

    #[test]
    fn first_member_wins_merged_overrides() {
        let mut res = AxisResolution::default();
        let mut first = AxisOverrides::default();
        first.tick_count = Some(3);
        let mut second = AxisOverrides::default();
        second.tick_count = Some(9);
        second.labels = Some(false);
        for overrides in [first, second] {
            res.push_member(
                AxisMember {
                    view: ViewId::from_raw(0),
                    title: None,
                    overrides,
                },
                Channel::X,
            );
        }
        let merged = res.merged_overrides();
        assert_eq!(merged.tick_count, Some(3));
        assert_eq!(merged.labels, Some(false));
    }
}
