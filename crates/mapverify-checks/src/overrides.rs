//! Override-name consistency.
//!
//! Three passes share the work:
//! - the direct ancestor walk finds field and method shades and private placeholder reuse, and
//!   in quick mode also mismatches between a method and a same-named ancestor method;
//! - the interface pass (quick mode) compares interface methods with whatever implements them,
//!   including superclass methods satisfying an interface added lower down;
//! - the exposure closure (default) merges, per owned class, every inherited method with the
//!   same name and descriptor plus the groups joined by bridge methods, then joins those groups
//!   across classes so each connected override group is reported once.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use mapverify_config::OverrideStrategy;
use mapverify_hierarchy::{ClassDirectory, ClassId, MethodId};

use crate::findings::{Finding, MappedGroup};
use crate::union_find::UnionFind;
use crate::{Verifier, VerifyContext};

pub struct OverrideNameChecker;

impl Verifier for OverrideNameChecker {
    fn name(&self) -> &'static str {
        "overridenames"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let mut findings = BTreeSet::new();
        let quick = ctx.override_strategy == OverrideStrategy::Quick;
        ancestor_walk(ctx, quick, &mut findings);
        match ctx.override_strategy {
            OverrideStrategy::Quick => interface_pass(ctx, &mut findings),
            OverrideStrategy::Closure => exposure_closure(ctx, &mut findings),
        }
        findings.into_iter().collect()
    }
}

fn ancestor_walk(ctx: &VerifyContext<'_>, report_mismatches: bool, out: &mut BTreeSet<Finding>) {
    let dir = ctx.directory;
    let (mappings, reverse) = (ctx.mappings, ctx.reverse);
    for class in dir.owned() {
        let record = dir.class(class);
        let class_name = record.name();

        for field in record.fields() {
            let field = dir.field(field);
            if field.is_static() {
                continue;
            }
            let mapped = mappings.remap_field(class_name, field.name());
            for &parent in dir.stack(class) {
                let parent_name = dir.class(parent).name();
                let unmapped = reverse.remap_field(&mappings.remap_class(parent_name), mapped);
                let Some(shaded) = dir.find_field(parent, unmapped) else {
                    continue;
                };
                if !dir.field(shaded).is_private() {
                    out.insert(Finding::FieldShade {
                        class: class_name.to_owned(),
                        field: field.name().to_owned(),
                        parent: parent_name.to_owned(),
                        parent_field: unmapped.to_owned(),
                        mapped: mapped.to_owned(),
                    });
                }
            }
        }

        for method in record.methods() {
            let m = dir.method(method);
            if m.is_static() || m.is_initializer() {
                continue;
            }
            let mapped = mappings.remap_method(class_name, m.name(), m.descriptor());
            let mapped_desc = mappings.remap_descriptor(m.descriptor());

            for &parent in dir.stack(class) {
                let parent_name = dir.class(parent).name();
                let unmapped = reverse.remap_method(
                    &mappings.remap_class(parent_name),
                    mapped,
                    &mapped_desc,
                );
                if let Some(same_mapped) = dir.find_method(parent, unmapped, m.descriptor()) {
                    if dir.method(same_mapped).is_private() {
                        // A private namesake is legal, but placeholder names must stay unique.
                        if ctx.naming.is_method_placeholder(mapped) {
                            out.insert(Finding::BadOverride {
                                class: class_name.to_owned(),
                                method: m.name().to_owned(),
                                descriptor: m.descriptor().to_owned(),
                                parent: parent_name.to_owned(),
                                parent_method: unmapped.to_owned(),
                                mapped: mapped.to_owned(),
                            });
                            continue;
                        }
                    } else if m.name() != unmapped {
                        out.insert(Finding::MethodShade {
                            class: class_name.to_owned(),
                            method: m.name().to_owned(),
                            descriptor: m.descriptor().to_owned(),
                            parent: parent_name.to_owned(),
                            parent_method: unmapped.to_owned(),
                            mapped: mapped.to_owned(),
                        });
                        continue;
                    }
                }

                if !report_mismatches || m.is_private() {
                    continue;
                }
                if let Some(overridden) = dir.find_method(parent, m.name(), m.descriptor()) {
                    if is_exposed(dir, overridden) {
                        if let Some(finding) = mismatch(ctx, [method, overridden]) {
                            out.insert(finding);
                        }
                    }
                }
            }
        }
    }
}

/// Owned interfaces against the classes that implement them directly and their ancestors.
fn interface_pass(ctx: &VerifyContext<'_>, out: &mut BTreeSet<Finding>) {
    let dir = ctx.directory;
    let mut implementers: BTreeMap<ClassId, BTreeSet<ClassId>> = dir
        .owned()
        .filter(|&c| dir.class(c).is_interface())
        .map(|c| (c, BTreeSet::new()))
        .collect();
    for class in dir.owned() {
        for interface in dir.class(class).interfaces() {
            if let Some(set) = implementers.get_mut(interface) {
                set.insert(class);
            }
        }
    }

    for (interface, classes) in implementers {
        let mut scope = BTreeSet::new();
        for &class in &classes {
            scope.insert(class);
            scope.extend(dir.stack(class).iter().copied());
        }
        for method in dir.class(interface).methods() {
            if !is_exposed(dir, method) {
                continue;
            }
            let m = dir.method(method);
            for &class in &scope {
                let Some(other) = dir.find_method(class, m.name(), m.descriptor()) else {
                    continue;
                };
                if other != method && is_exposed(dir, other) {
                    if let Some(finding) = mismatch(ctx, [method, other]) {
                        out.insert(finding);
                    }
                }
            }
        }
    }
}

/// Whether the method is visible to virtual dispatch from subclasses.
fn is_exposed(dir: &ClassDirectory, method: MethodId) -> bool {
    let m = dir.method(method);
    !m.is_initializer() && !m.is_static() && !m.is_private()
}

/// Methods a class exposes to dispatch, by `name + descriptor`, merged from its ancestors.
#[derive(Debug, Default)]
struct Exposure {
    methods: BTreeMap<String, BTreeSet<MethodId>>,
    /// bridge key → keys of the methods it forwards to
    bounces: BTreeMap<String, BTreeSet<String>>,
}

struct ExposureCache<'d> {
    dir: &'d ClassDirectory,
    cache: HashMap<ClassId, Rc<Exposure>>,
    active: HashSet<ClassId>,
}

impl<'d> ExposureCache<'d> {
    fn new(dir: &'d ClassDirectory) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
            active: HashSet::new(),
        }
    }

    fn get(&mut self, class: ClassId) -> Rc<Exposure> {
        if let Some(cached) = self.cache.get(&class) {
            return Rc::clone(cached);
        }
        if !self.active.insert(class) {
            tracing::warn!(class = %self.dir.class(class).name(), "inheritance cycle");
            return Rc::default();
        }

        let dir = self.dir;
        let record = dir.class(class);
        let mut out = Exposure::default();
        for parent in record.parent().into_iter().chain(record.interfaces().iter().copied()) {
            let inherited = self.get(parent);
            for (key, methods) in &inherited.methods {
                out.methods
                    .entry(key.clone())
                    .or_default()
                    .extend(methods.iter().copied());
            }
            for (key, targets) in &inherited.bounces {
                out.bounces
                    .entry(key.clone())
                    .or_default()
                    .extend(targets.iter().cloned());
            }
        }

        for method in record.methods() {
            let m = dir.method(method);
            if m.is_initializer() {
                continue;
            }
            let key = format!("{}{}", m.name(), m.descriptor());
            if m.is_static() || m.is_private() {
                if out.methods.contains_key(&key) {
                    tracing::warn!(
                        method = %dir.describe_method(method),
                        "private or static method hides an inherited method"
                    );
                }
                continue;
            }
            out.methods.entry(key.clone()).or_default().insert(method);

            if let Some(target) = self.bounce_target(method) {
                let target = dir.method(target);
                out.bounces
                    .entry(key)
                    .or_default()
                    .insert(format!("{}{}", target.name(), target.descriptor()));
            }
        }

        self.active.remove(&class);
        let out = Rc::new(out);
        self.cache.insert(class, Rc::clone(&out));
        out
    }

    fn bounce_target(&self, bridge: MethodId) -> Option<MethodId> {
        let dir = self.dir;
        let bounce = dir.method(bridge).bounce()?;
        if let Some(target) = dir.bridge_target(bridge) {
            return Some(target);
        }
        let target = dir
            .lookup(&bounce.owner)
            .and_then(|owner| dir.find_method(owner, &bounce.name, &bounce.descriptor));
        if target.is_none() {
            tracing::warn!(
                bridge = %dir.describe_method(bridge),
                target = %format!("{}.{}{}", bounce.owner, bounce.name, bounce.descriptor),
                "bridge target not found"
            );
        }
        target
    }
}

fn exposure_closure(ctx: &VerifyContext<'_>, out: &mut BTreeSet<Finding>) {
    let dir = ctx.directory;
    let mut exposures = ExposureCache::new(dir);
    let mut groups = UnionFind::new();

    for class in dir.owned() {
        let exposure = exposures.get(class);
        for methods in exposure.methods.values() {
            let mut members = methods.iter().copied();
            if let Some(first) = members.next() {
                groups.find(first);
                for other in members {
                    groups.union(first, other);
                }
            }
        }
        for (key, targets) in &exposure.bounces {
            for target in targets {
                let left = exposure.methods.get(key).and_then(|m| m.first());
                let right = exposure.methods.get(target).and_then(|m| m.first());
                match (left, right) {
                    (Some(&left), Some(&right)) => {
                        groups.union(left, right);
                    }
                    _ => tracing::warn!(
                        class = %dir.class(class).name(),
                        bridge = %key,
                        target = %target,
                        "unable to merge bridge group"
                    ),
                }
            }
        }
    }

    let mut components: BTreeMap<MethodId, Vec<MethodId>> = BTreeMap::new();
    for method in groups.elements() {
        components.entry(groups.find(method)).or_default().push(method);
    }
    for members in components.into_values() {
        if let Some(finding) = mismatch(ctx, members) {
            out.insert(finding);
        }
    }
}

/// An override-mismatch finding when the methods do not all share one mapped name.
fn mismatch(
    ctx: &VerifyContext<'_>,
    methods: impl IntoIterator<Item = MethodId>,
) -> Option<Finding> {
    let dir = ctx.directory;
    let mut named: BTreeMap<&str, Vec<MethodId>> = BTreeMap::new();
    for method in methods {
        named.entry(ctx.mapped_method(method)).or_default().push(method);
    }
    if named.len() < 2 {
        return None;
    }
    let groups = named
        .into_iter()
        .map(|(mapped, mut methods)| {
            methods.sort_by(|&a, &b| dir.compare_methods(a, b));
            methods.dedup();
            MappedGroup {
                mapped: mapped.to_owned(),
                methods: methods.into_iter().map(|m| dir.describe_method(m)).collect(),
            }
        })
        .collect();
    Some(Finding::OverrideMismatch { groups })
}
