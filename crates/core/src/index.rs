//! Typed lookup over the resources of one bundle.
//!
//! The index borrows the bundle and never copies resources. Lookups are linear scans in
//! bundle order: the type filter runs first (by enum variant, not by type name), then each
//! predicate in turn, and the first survivor wins. No match is `None`, never an error.

use fhir::{
    AllergyIntolerance, Appointment, Bundle, ClinicalImpression, Composition, Consent,
    DiagnosticReport, Encounter, EpisodeOfCare, ListResource, Location, MedicationStatement,
    Observation, Organization, Patient, Practitioner, Reference, RelatedPerson, Resource,
    ResourceType,
};
use std::collections::HashSet;

/// A resource type that can be pulled out of [`Resource`] by variant.
pub trait TypedResource: 'static {
    const TYPE: ResourceType;

    fn from_resource(resource: &Resource) -> Option<&Self>;

    fn resource_id(&self) -> Option<&str>;
}

macro_rules! typed_resource {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl TypedResource for $ty {
                const TYPE: ResourceType = ResourceType::$variant;

                fn from_resource(resource: &Resource) -> Option<&Self> {
                    match resource {
                        Resource::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn resource_id(&self) -> Option<&str> {
                    self.id.as_deref()
                }
            }
        )*
    };
}

typed_resource! {
    Encounter => Encounter,
    Patient => Patient,
    Organization => Organization,
    Practitioner => Practitioner,
    Consent => Consent,
    Observation => Observation,
    EpisodeOfCare => EpisodeOfCare,
    Location => Location,
    Composition => Composition,
    RelatedPerson => RelatedPerson,
    MedicationStatement => MedicationStatement,
    AllergyIntolerance => AllergyIntolerance,
    DiagnosticReport => DiagnosticReport,
    ClinicalImpression => ClinicalImpression,
    Appointment => Appointment,
    List => ListResource,
}

/// A filter applied after the type filter.
pub type Predicate<'p, T> = &'p dyn Fn(&T) -> bool;

/// Read-only index over a bundle's resources.
#[derive(Clone, Debug)]
pub struct ResourceIndex<'a> {
    bundle: &'a Bundle,
    resources: Vec<&'a Resource>,
}

impl<'a> ResourceIndex<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        let resources: Vec<&'a Resource> = bundle.resources().collect();

        let mut seen = HashSet::new();
        for resource in &resources {
            let Some(id) = resource.id() else { continue };
            if !seen.insert((resource.type_name(), id)) {
                tracing::debug!(
                    resource_type = resource.type_name(),
                    id,
                    "duplicate resource id in bundle; first occurrence wins"
                );
            }
        }

        Self { bundle, resources }
    }

    pub fn bundle(&self) -> &'a Bundle {
        self.bundle
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All resources of type `T`, in bundle order.
    pub fn all<T: TypedResource>(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.resources.iter().copied().filter_map(T::from_resource)
    }

    /// First resource of type `T` accepted by every predicate.
    pub fn find<T: TypedResource>(&self, predicates: &[Predicate<'_, T>]) -> Option<&'a T> {
        self.all::<T>()
            .find(|candidate| predicates.iter().all(|accept| accept(candidate)))
    }

    /// First resource of type `T` in the bundle.
    pub fn find_first<T: TypedResource>(&self) -> Option<&'a T> {
        self.find::<T>(&[])
    }

    /// Resolve a reference against resources of type `T`.
    ///
    /// Only the id parts are compared, so `http://host/Organization/1`, `Organization/1` and
    /// a stored id of `1` all match.
    pub fn find_by_reference<T: TypedResource>(&self, reference: &Reference) -> Option<&'a T> {
        let wanted = reference_id(reference)?;
        let found = self.find::<T>(&[&|candidate: &T| {
            candidate
                .resource_id()
                .and_then(fhir::id_part)
                .is_some_and(|id| id == wanted)
        }]);
        if found.is_none() {
            tracing::debug!(
                reference = reference.reference.as_deref(),
                resource_type = %T::TYPE,
                "reference not resolved in bundle"
            );
        }
        found
    }

    /// Resolve a reference against any resource type.
    ///
    /// When the reference names a type, only resources of that type are considered, so
    /// `Organization/1` and `Practitioner/1` never collide.
    pub fn find_by_reference_any(&self, reference: &Reference) -> Option<&'a Resource> {
        let parsed = fhir::parse_reference(reference.reference.as_deref()?).ok()?;
        self.resources.iter().copied().find(|candidate| {
            let type_matches = parsed
                .resource_type
                .as_deref()
                .map_or(true, |wanted| candidate.type_name() == wanted);
            type_matches
                && candidate
                    .id()
                    .and_then(fhir::id_part)
                    .is_some_and(|id| id == parsed.id)
        })
    }
}

fn reference_id(reference: &Reference) -> Option<String> {
    reference.reference.as_deref().and_then(fhir::id_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_bundle;

    #[test]
    fn finds_first_of_type() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let patient = index.find_first::<Patient>().expect("patient present");
        assert_eq!(patient.id.as_deref(), Some("1"));
        assert!(index
            .find::<Patient>(&[&|p: &Patient| p.gender.as_deref() == Some("female")])
            .is_none());
    }

    #[test]
    fn predicates_apply_in_order() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let named = index.find::<Organization>(&[
            &|o: &Organization| o.id.is_some(),
            &|o: &Organization| o.name.as_deref() == Some("Medway Medical Practice"),
        ]);
        assert!(named.is_some());

        let none = index.find::<Organization>(&[&|o: &Organization| o.name.is_none()]);
        assert!(none.is_none());
    }

    #[test]
    fn absolute_reference_matches_relative_id() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let org = index
            .find_by_reference::<Organization>(&Reference::to("http://host/Organization/1"))
            .expect("resolved by id part");
        assert_eq!(org.name.as_deref(), Some("Medway Medical Practice"));
    }

    #[test]
    fn unresolved_reference_is_none() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        assert!(index
            .find_by_reference::<Organization>(&Reference::to("Organization/99"))
            .is_none());
        assert!(index
            .find_by_reference::<Organization>(&Reference::default())
            .is_none());
        assert!(index
            .find_by_reference_any(&Reference::to("#contained"))
            .is_none());
    }

    #[test]
    fn untyped_lookup_honours_reference_type() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);

        let org = index
            .find_by_reference_any(&Reference::to("Organization/1"))
            .expect("organization");
        assert_eq!(org.resource_type(), Some(ResourceType::Organization));

        let practitioner = index
            .find_by_reference_any(&Reference::to("Practitioner/1"))
            .expect("practitioner");
        assert_eq!(practitioner.resource_type(), Some(ResourceType::Practitioner));
    }

    #[test]
    fn duplicate_ids_resolve_to_first() {
        let mut bundle = Bundle::new();
        bundle.push(Resource::Organization(Organization {
            id: Some("1".into()),
            name: Some("First".into()),
            ..Default::default()
        }));
        bundle.push(Resource::Organization(Organization {
            id: Some("1".into()),
            name: Some("Second".into()),
            ..Default::default()
        }));
        let index = ResourceIndex::new(&bundle);
        let org = index
            .find_by_reference::<Organization>(&Reference::to("Organization/1"))
            .expect("resolved");
        assert_eq!(org.name.as_deref(), Some("First"));
    }

    #[test]
    fn empty_bundle_finds_nothing() {
        let bundle = Bundle::new();
        let index = ResourceIndex::new(&bundle);
        assert!(index.is_empty());
        assert!(index.find_first::<Encounter>().is_none());
    }
}
