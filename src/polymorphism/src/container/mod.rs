use std::{collections::{BTreeMap, BTreeSet}, fmt::{self, Display, Formatter}, ops::Deref, str::FromStr};

use genotype::{MonolocusGenotype, MultilocusGenotype};
use log::trace;
use serde::{Serialize, Deserialize};

mod error;
pub use error::ContainerError;

/// Population label attached to each multilocus genotype of a [`PolymorphismMultiGContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

impl From<usize> for GroupId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl Deref for GroupId {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for GroupId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<usize>().map(Self)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A multilocus genotype, and the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GroupedGenotype {
    group   : GroupId,
    genotype: MultilocusGenotype,
}

/// Serialized layout of a container. Group ids referenced by records but missing from `groups`
/// are registered with an empty name upon deserialization.
#[derive(Deserialize)]
struct ContainerData {
    #[serde(default)]
    groups : BTreeMap<GroupId, String>,
    #[serde(default)]
    records: Vec<GroupedGenotype>,
}

/// Ordered collection of multilocus genotypes, each tagged with a [`GroupId`].
///
/// The insertion order of a record is its identity (i.e. its position). The container also keeps
/// a registry of group names; a group with an empty name is displayed using its id.
///
/// Alignment (every genotype sharing the same number of loci) is not enforced at insertion: see
/// [`Self::is_aligned`] and [`Self::number_of_loci`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContainerData")]
pub struct PolymorphismMultiGContainer {
    groups : BTreeMap<GroupId, String>,
    records: Vec<GroupedGenotype>,
}

impl From<ContainerData> for PolymorphismMultiGContainer {
    fn from(data: ContainerData) -> Self {
        let mut container = Self{groups: data.groups, records: data.records};
        let referenced = container.all_group_ids();
        for id in referenced {
            container.groups.entry(id).or_default();
        }
        container
    }
}

impl PolymorphismMultiGContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_position(&self, position: usize) -> Result<(), ContainerError> {
        match position < self.records.len() {
            true  => Ok(()),
            false => Err(ContainerError::PositionOutOfBounds{index: position, len: self.records.len()}),
        }
    }

    /// Append a multilocus genotype to the container. `group` is registered with an empty name if
    /// it was never seen before.
    pub fn add_multilocus_genotype(&mut self, genotype: MultilocusGenotype, group: GroupId) {
        self.groups.entry(group).or_default();
        self.records.push(GroupedGenotype{group, genotype});
    }

    /// # Errors
    /// - `PositionOutOfBounds` if `position >= self.size()`
    pub fn multilocus_genotype(&self, position: usize) -> Result<&MultilocusGenotype, ContainerError> {
        self.check_position(position)?;
        Ok(&self.records[position].genotype)
    }

    /// Remove the record at `position` and return its genotype. Subsequent records are shifted.
    /// # Errors
    /// - `PositionOutOfBounds` if `position >= self.size()`
    pub fn remove_multilocus_genotype(&mut self, position: usize) -> Result<MultilocusGenotype, ContainerError> {
        self.check_position(position)?;
        Ok(self.records.remove(position).genotype)
    }

    /// # Errors
    /// - `PositionOutOfBounds` if `position >= self.size()`
    pub fn delete_multilocus_genotype(&mut self, position: usize) -> Result<(), ContainerError> {
        self.remove_multilocus_genotype(position).map(|_| ())
    }

    /// `true` if all the genotypes share the same number of loci. Trivially `true` when empty.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        let mut sizes = self.records.iter().map(|record| record.genotype.size());
        match sizes.next() {
            Some(first) => sizes.all(|size| size == first),
            None        => true,
        }
    }

    /// Common number of loci of the genotypes.
    /// # Errors
    /// - `NotAligned` if the container is empty or not aligned.
    pub fn number_of_loci(&self) -> Result<usize, ContainerError> {
        match self.records.first() {
            Some(record) if self.is_aligned() => Ok(record.genotype.size()),
            _                                 => Err(ContainerError::NotAligned),
        }
    }

    /// # Errors
    /// - `PositionOutOfBounds` if `position >= self.size()`
    pub fn group_id(&self, position: usize) -> Result<GroupId, ContainerError> {
        self.check_position(position)?;
        Ok(self.records[position].group)
    }

    /// Move the record at `position` to another group, registering `group` if needed.
    /// # Errors
    /// - `PositionOutOfBounds` if `position >= self.size()`
    pub fn set_group_id(&mut self, position: usize, group: GroupId) -> Result<(), ContainerError> {
        self.check_position(position)?;
        self.groups.entry(group).or_default();
        self.records[position].group = group;
        Ok(())
    }

    /// Distinct group ids carried by at least one record.
    #[must_use]
    pub fn all_group_ids(&self) -> BTreeSet<GroupId> {
        self.records.iter().map(|record| record.group).collect()
    }

    /// `true` if `group` is registered within the container.
    #[must_use]
    pub fn group_exists(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    /// Ensure every group of `groups` is registered.
    /// # Errors
    /// - `GroupNotFound` for the first unregistered group id.
    pub fn check_groups<'a>(&self, groups: impl IntoIterator<Item = &'a GroupId>) -> Result<(), ContainerError> {
        match groups.into_iter().find(|group| !self.group_exists(**group)) {
            Some(missing) => Err(ContainerError::GroupNotFound(*missing)),
            None          => Ok(()),
        }
    }

    /// Number of registered groups.
    #[must_use]
    pub fn number_of_groups(&self) -> usize {
        self.groups.len()
    }

    /// Display name of a group. Falls back to the stringified id if the group has no name.
    /// # Errors
    /// - `GroupNotFound` if `group` is not registered.
    pub fn group_name(&self, group: GroupId) -> Result<String, ContainerError> {
        match self.groups.get(&group) {
            Some(name) if name.is_empty() => Ok(group.to_string()),
            Some(name)                    => Ok(name.clone()),
            None                          => Err(ContainerError::GroupNotFound(group)),
        }
    }

    /// Rename an already registered group.
    /// # Errors
    /// - `GroupNotFound` if `group` is not registered.
    pub fn set_group_name(&mut self, group: GroupId, name: impl Into<String>) -> Result<(), ContainerError> {
        let slot = self.groups.get_mut(&group).ok_or(ContainerError::GroupNotFound(group))?;
        *slot = name.into();
        Ok(())
    }

    /// Register a group name, overwriting any previous one.
    pub fn add_group_name(&mut self, group: GroupId, name: impl Into<String>) {
        self.groups.insert(group, name.into());
    }

    /// Display names of every registered group, ordered by group id.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter()
            .map(|(id, name)| if name.is_empty() { id.to_string() } else { name.clone() })
            .collect()
    }

    /// Number of records belonging to `group`, missing data included.
    #[must_use]
    pub fn group_size(&self, group: GroupId) -> usize {
        self.records.iter().filter(|record| record.group == group).count()
    }

    /// Number of records of `group` carrying a non-missing genotype at `locus_position`.
    /// # Errors
    /// - `Genotype(LocusOutOfBounds)` if `locus_position` exceeds the size of a member genotype.
    pub fn locus_group_size(&self, group: GroupId, locus_position: usize) -> Result<usize, ContainerError> {
        let mut size = 0;
        for record in self.records.iter().filter(|record| record.group == group) {
            if !record.genotype.is_monolocus_genotype_missing(locus_position)? {
                size += 1;
            }
        }
        Ok(size)
    }

    /// Non-missing single-locus genotypes found at `locus_position`, for every member of `groups`,
    /// in insertion order.
    /// # Errors
    /// - `GroupNotFound` if any of `groups` is not registered.
    /// - `Genotype(LocusOutOfBounds)` if `locus_position` exceeds the size of a member genotype.
    pub fn monolocus_genotypes(&self, locus_position: usize, groups: &BTreeSet<GroupId>) -> Result<Vec<&MonolocusGenotype>, ContainerError> {
        self.check_groups(groups)?;
        let mut genotypes = Vec::new();
        for record in self.records.iter().filter(|record| groups.contains(&record.group)) {
            if let Some(genotype) = record.genotype.monolocus_genotype(locus_position)? {
                genotypes.push(genotype);
            }
        }
        trace!("Locus {locus_position}: found {} non-missing genotypes within groups {groups:?}", genotypes.len());
        Ok(genotypes)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record and group name.
    pub fn clear(&mut self) {
        self.records.clear();
        self.groups.clear();
    }

    /// Iterate over `(genotype, group)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&MultilocusGenotype, GroupId)> {
        self.records.iter().map(|record| (&record.genotype, record.group))
    }

    /// Mutable access to the genotype at `position`. Used by the permutation operators.
    pub(crate) fn multilocus_genotype_mut(&mut self, position: usize) -> Result<&mut MultilocusGenotype, ContainerError> {
        self.check_position(position)?;
        Ok(&mut self.records[position].genotype)
    }

    /// Registered name of a group, without falling back to its id.
    pub(crate) fn raw_group_name(&self, group: GroupId) -> Option<&str> {
        self.groups.get(&group).map(String::as_str)
    }

    /// Copy of the group name registry, without any record.
    pub(crate) fn empty_with_groups(&self) -> Self {
        Self{groups: self.groups.clone(), records: Vec::new()}
    }
}
