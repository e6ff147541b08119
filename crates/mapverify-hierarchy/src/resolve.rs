use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::directory::{ClassDirectory, ClassId, ClassState, MethodId};

/// Bridge → target pairs waiting for the bridge's class to resolve, keyed by that class.
type PendingMerges = HashMap<ClassId, Vec<(MethodId, MethodId)>>;

impl ClassDirectory {
    /// Resolves every owned class and, transitively, its ancestors. Ancestors always finish
    /// before their descendants. Classes already resolved are left alone.
    pub fn resolve_all(&mut self) {
        for method in &mut self.methods {
            method.roots = OnceLock::new();
        }
        for class in &mut self.classes {
            class.stack = OnceLock::new();
        }
        self.link_bridges();

        let owned: Vec<ClassId> = self.owned().collect();
        let mut pending = PendingMerges::new();
        for id in owned {
            self.resolve_class(id, &mut pending);
        }
        if !pending.is_empty() {
            debug!(classes = pending.len(), "bridge merges left pending");
        }
    }

    /// Builds the canonical bridge → target edges and their reverse index. A target is looked
    /// up in the bridge's own class, or along the superclass chain starting at its direct
    /// superclass while classes there have been read.
    fn link_bridges(&mut self) {
        self.bridge_targets.clear();
        self.bridges_to.clear();

        let mut edges = Vec::new();
        for (idx, method) in self.methods.iter().enumerate() {
            let Some(bounce) = method.bounce() else {
                continue;
            };
            let bridge = MethodId::from_usize(idx);
            let key = crate::directory::method_key(&bounce.name, &bounce.descriptor);
            let class = self.class(method.owner());

            let target = if class.name() == bounce.owner {
                self.method_by_key(method.owner(), &key)
            } else {
                match class.parent() {
                    Some(parent) if self.class(parent).name() == bounce.owner => {
                        let mut cursor = Some(parent);
                        let mut found = None;
                        while let Some(c) = cursor {
                            if !self.class(c).was_read() {
                                break;
                            }
                            if let Some(m) = self.method_by_key(c, &key) {
                                found = Some(m);
                                break;
                            }
                            cursor = self.class(c).parent();
                        }
                        found
                    }
                    _ => None,
                }
            };

            match target {
                Some(target) if target != bridge => edges.push((bridge, target)),
                Some(_) => {}
                None => debug!(
                    bridge = %self.describe_method(bridge),
                    "bridge target not found in the hierarchy"
                ),
            }
        }

        for (bridge, target) in edges {
            self.bridge_targets.insert(bridge, target);
            self.bridges_to.entry(target).or_default().push(bridge);
        }
    }

    fn resolve_class(&mut self, id: ClassId, pending: &mut PendingMerges) {
        match self.classes[id.idx()].state {
            ClassState::Resolved => return,
            ClassState::Resolving => {
                warn!(class = %self.class(id).name(), "inheritance cycle detected");
                return;
            }
            ClassState::Stub => {
                self.classes[id.idx()].state = ClassState::Resolved;
                return;
            }
            ClassState::Read => {}
        }
        self.classes[id.idx()].state = ClassState::Resolving;

        let record = self.class(id);
        let supers: Vec<ClassId> = record
            .parent()
            .into_iter()
            .chain(record.interfaces().iter().copied())
            .collect();
        for s in supers {
            self.resolve_class(s, pending);
        }
        debug!(class = %self.class(id).name(), "resolving overrides");

        let stack = self.stack(id).to_vec();
        let methods: Vec<MethodId> = self.class(id).methods().collect();

        self.link_direct_overrides(&methods, &stack);
        self.link_bridge_roots(id, &methods, pending);
        if !self.class(id).is_abstract() {
            self.satisfy_abstract_methods(id, &stack);
        }

        if let Some(merges) = pending.remove(&id) {
            for (bridge, target) in merges {
                if self.methods[bridge.idx()].overrides.is_empty() {
                    continue;
                }
                let mut roots = self.flatten_roots(bridge);
                roots.remove(&target);
                self.methods[target.idx()].overrides.extend(roots);
            }
        }

        self.classes[id.idx()].state = ClassState::Resolved;
    }

    /// Each dispatchable method overrides the roots of the first overridable same-key method in
    /// the ancestor stack.
    fn link_direct_overrides(&mut self, methods: &[MethodId], stack: &[ClassId]) {
        for &m in methods {
            if !self.method(m).can_override() {
                continue;
            }
            let key = self.method(m).key();
            let parent = stack.iter().find_map(|&ancestor| {
                self.method_by_key(ancestor, &key)
                    .filter(|&p| self.method(p).can_be_overridden())
            });
            if let Some(p) = parent {
                let mut roots = self.flatten_roots(p);
                roots.remove(&m);
                self.methods[m.idx()].overrides.extend(roots);
            }
        }
    }

    /// A method that overrides nothing itself inherits the roots of the bridges forwarding to
    /// it. Bridges in classes not yet resolved are recorded and merged once they are.
    fn link_bridge_roots(
        &mut self,
        id: ClassId,
        methods: &[MethodId],
        pending: &mut PendingMerges,
    ) {
        for &m in methods {
            let method = self.method(m);
            if !method.overrides.is_empty() || !method.can_override() {
                continue;
            }
            let Some(bridges) = self.bridges_to.get(&m).cloned() else {
                continue;
            };
            for bridge in bridges {
                let bridge_owner = self.method(bridge).owner();
                // A same-key bridge in a subclass is an ordinary override of `m`.
                if self.method(bridge).key() == self.method(m).key()
                    && self.stack(bridge_owner).contains(&id)
                {
                    continue;
                }
                if !self.method(bridge).overrides.is_empty() {
                    let mut roots = self.flatten_roots(bridge);
                    roots.remove(&m);
                    self.methods[m.idx()].overrides.extend(roots);
                } else if bridge_owner != id
                    && self.class(bridge_owner).state() != ClassState::Resolved
                {
                    pending.entry(bridge_owner).or_default().push((bridge, m));
                }
            }
        }
    }

    /// Concrete methods anywhere in `[id] + stack` satisfy still-unrooted abstract declarations
    /// with the same key. Every colliding abstract declaration is attached to the first match.
    fn satisfy_abstract_methods(&mut self, id: ClassId, stack: &[ClassId]) {
        let scope: Vec<ClassId> = std::iter::once(id).chain(stack.iter().copied()).collect();

        let mut open: HashMap<String, Vec<MethodId>> = HashMap::new();
        for &c in &scope {
            for m in self.class(c).methods() {
                let method = self.method(m);
                if method.is_abstract() && method.overrides.is_empty() {
                    open.entry(method.key()).or_default().push(m);
                }
            }
        }
        if open.is_empty() {
            return;
        }

        for &c in &scope {
            let methods: Vec<MethodId> = self.class(c).methods().collect();
            for m in methods {
                let method = self.method(m);
                if method.is_abstract() || !method.can_override() {
                    continue;
                }
                if let Some(targets) = open.remove(&method.key()) {
                    self.methods[m.idx()].overrides.extend(targets);
                }
            }
        }
    }

    /// Follows override edges down to methods that override nothing. Uncached; used while
    /// override sets may still grow.
    fn flatten_roots(&self, method: MethodId) -> BTreeSet<MethodId> {
        let mut roots = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut work = vec![method];
        while let Some(next) = work.pop() {
            if !seen.insert(next) {
                continue;
            }
            let overrides = &self.methods[next.idx()].overrides;
            if overrides.is_empty() {
                roots.insert(next);
            } else {
                work.extend(overrides.iter().copied());
            }
        }
        if roots.is_empty() {
            // Only reachable through an override cycle.
            roots.insert(method);
        }
        roots
    }

    /// The root declarations `method` ultimately overrides, sorted by owner name, name and
    /// descriptor. A method that overrides nothing is its own root.
    ///
    /// Meaningful only after [`resolve_all`](Self::resolve_all); computed once per method.
    pub fn root_closure(&self, method: MethodId) -> &[MethodId] {
        self.methods[method.idx()].roots.get_or_init(|| {
            let mut roots: Vec<MethodId> = self.flatten_roots(method).into_iter().collect();
            roots.sort_by(|&a, &b| self.compare_methods(a, b));
            roots
        })
    }

    /// Direct override edges recorded during resolution.
    pub fn overrides(&self, method: MethodId) -> impl Iterator<Item = MethodId> + '_ {
        self.methods[method.idx()].overrides.iter().copied()
    }

    pub fn bridge_target(&self, bridge: MethodId) -> Option<MethodId> {
        self.bridge_targets.get(&bridge).copied()
    }

    pub fn bridges_to(&self, target: MethodId) -> &[MethodId] {
        self.bridges_to.get(&target).map_or(&[][..], Vec::as_slice)
    }
}
