//! Arena-backed document tree with mutation observation and event dispatch.

use crate::event::EventHandler;
use crate::event::EventState;
use crate::event::EventType;
use crate::event::ListenerOptions;
use crate::event::ListenerSlot;
use crate::observer::MutationKind;
use crate::observer::MutationRecord;
use crate::observer::ObserveOptions;
use crate::observer::ObserverId;
use crate::observer::ObserverSlot;
use crate::selector::Compound;
use crate::selector::Selector;
use sf_core::EngineError;
use sf_core::EngineResult;
use std::collections::BTreeMap;
use std::rc::Rc;

/// ID used to address nodes in the DOM arena. Never reused, so a stale id
/// simply stops resolving instead of aliasing a new element.
pub type NodeId = u64;

#[derive(Debug)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<ListenerSlot>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

/// Document model for a host page the engine does not own: a tree it can
/// query and patch, with observers reporting every change made behind its
/// back.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    title: Option<NodeId>,
    observers: Vec<ObserverSlot>,
    next_observer: ObserverId,
    write_ops: u64,
}

impl Document {
    /// Builds the seed tree `html > (head > title) + body`.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let head = doc.push_node(Element::new("head"));
        let title = doc.push_node(Element::new("title"));
        let body = doc.push_node(Element::new("body"));
        doc.link(doc.root, head);
        doc.link(head, title);
        doc.link(doc.root, body);
        doc.head = head;
        doc.body = body;
        doc.title = Some(title);
        doc
    }

    /// Seed tree without a `title` node, for hosts that never render one.
    pub fn without_title() -> Self {
        let mut doc = Self::bare();
        let head = doc.push_node(Element::new("head"));
        let body = doc.push_node(Element::new("body"));
        doc.link(doc.root, head);
        doc.link(doc.root, body);
        doc.head = head;
        doc.body = body;
        doc
    }

    fn bare() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: 0,
            head: 0,
            body: 0,
            title: None,
            observers: Vec::new(),
            next_observer: 1,
            write_ops: 0,
        };
        doc.root = doc.push_node(Element::new("html"));
        doc
    }

    fn push_node(&mut self, element: Element) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Some(element));
        id
    }

    /// Seed-tree wiring; does not notify observers or count as a write.
    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(element) = self.element_mut(child) {
            element.parent = Some(parent);
        }
        if let Some(element) = self.element_mut(parent) {
            element.children.push(child);
        }
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id as usize).and_then(|slot| slot.as_ref())
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
    }

    fn require(&self, id: NodeId) -> EngineResult<&Element> {
        self.element(id)
            .ok_or_else(|| EngineError::new("dom.node_missing", format!("no node with id {id}")))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn title_node(&self) -> Option<NodeId> {
        self.title
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).and_then(|element| element.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.element(id) {
            Some(element) => &element.children,
            None => &[],
        }
    }

    /// True when the node is still reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Total tree-mutating operations performed so far. Lets callers assert
    /// that an operation performed zero redundant writes.
    pub fn write_ops(&self) -> u64 {
        self.write_ops
    }

    // ---- tree mutation -----------------------------------------------------

    /// Creates a detached element; it joins the tree via `append_child`.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(Element::new(tag))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> EngineResult<()> {
        self.require(parent)?;
        let child_parent = self.require(child)?.parent;
        if child_parent.is_some() {
            return Err(EngineError::new(
                "dom.child_attached",
                format!("node {child} already has a parent"),
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(EngineError::new(
                "dom.cycle",
                format!("node {child} is an ancestor of {parent}"),
            ));
        }

        if let Some(element) = self.element_mut(child) {
            element.parent = Some(parent);
        }
        if let Some(element) = self.element_mut(parent) {
            element.children.push(child);
        }
        self.write_ops += 1;
        self.route_record(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        });
        Ok(())
    }

    /// Detaches `child` from `parent`. The subtree stays allocated, so stale
    /// ids keep resolving but report as disconnected.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> EngineResult<()> {
        self.require(parent)?;
        if self.require(child)?.parent != Some(parent) {
            return Err(EngineError::new(
                "dom.not_a_child",
                format!("node {child} is not a child of {parent}"),
            ));
        }

        if let Some(element) = self.element_mut(parent) {
            element.children.retain(|&id| id != child);
        }
        if let Some(element) = self.element_mut(child) {
            element.parent = None;
        }
        self.write_ops += 1;
        self.route_record(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
            },
        });
        Ok(())
    }

    /// Attribute names are stored lowercased, so lookups fold case too.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.element(id)
            .and_then(|element| element.attributes.get(&name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> EngineResult<()> {
        self.require(id)?;
        if let Some(element) = self.element_mut(id) {
            element
                .attributes
                .insert(name.to_ascii_lowercase(), value.to_owned());
        }
        self.write_ops += 1;
        self.route_record(MutationRecord {
            target: id,
            kind: MutationKind::Attribute {
                name: name.to_ascii_lowercase(),
            },
        });
        Ok(())
    }

    /// Returns whether the attribute was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> EngineResult<bool> {
        self.require(id)?;
        let name = name.to_ascii_lowercase();
        let removed = match self.element_mut(id) {
            Some(element) => element.attributes.remove(&name).is_some(),
            None => false,
        };
        if removed {
            self.write_ops += 1;
            self.route_record(MutationRecord {
                target: id,
                kind: MutationKind::Attribute { name },
            });
        }
        Ok(removed)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.text.as_str())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> EngineResult<()> {
        self.require(id)?;
        if let Some(element) = self.element_mut(id) {
            element.text = text.to_owned();
        }
        self.write_ops += 1;
        self.route_record(MutationRecord {
            target: id,
            kind: MutationKind::CharacterData,
        });
        Ok(())
    }

    pub fn set_title(&mut self, text: &str) -> EngineResult<()> {
        let title = self.title.ok_or_else(|| {
            EngineError::new("dom.title_missing", "document has no title node")
        })?;
        self.set_text(title, text)
    }

    // ---- queries -----------------------------------------------------------

    pub fn get_element_by_id(&self, id_value: &str) -> Option<NodeId> {
        self.traverse()
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id_value))
    }

    /// All connected elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.traverse()
            .into_iter()
            .filter(|&node| self.matches(node, selector))
            .collect()
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let Some((subject, ancestors)) = selector.steps.split_last() else {
            return false;
        };
        if !self.matches_compound(node, subject) {
            return false;
        }

        let mut current = self.parent(node);
        for step in ancestors.iter().rev() {
            let mut found = false;
            while let Some(candidate) = current {
                current = self.parent(candidate);
                if self.matches_compound(candidate, step) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };

        if let Some(tag) = &compound.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &compound.id {
            if element.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !compound.classes.is_empty() {
            let class_attr = element.attributes.get("class").map(String::as_str);
            let Some(class_attr) = class_attr else {
                return false;
            };
            for wanted in &compound.classes {
                if !class_attr.split_whitespace().any(|class| class == wanted) {
                    return false;
                }
            }
        }
        for attribute in &compound.attributes {
            match element.attributes.get(&attribute.name) {
                Some(value) => {
                    if let Some(wanted) = &attribute.value {
                        if value != wanted {
                            return false;
                        }
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Preorder walk of the connected tree.
    fn traverse(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    fn is_inclusive_ancestor(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    // ---- listeners and dispatch -------------------------------------------

    /// Registers a listener. Duplicate registrations (same event, phase, and
    /// handler identity) are ignored, mirroring `addEventListener`.
    pub fn add_event_listener(
        &mut self,
        id: NodeId,
        event: EventType,
        options: ListenerOptions,
        handler: EventHandler,
    ) -> EngineResult<bool> {
        self.require(id)?;
        let duplicate = self.element(id).is_some_and(|element| {
            element.listeners.iter().any(|slot| {
                slot.event == event
                    && slot.options.capture == options.capture
                    && Rc::ptr_eq(&slot.handler, &handler)
            })
        });
        if duplicate {
            return Ok(false);
        }

        if let Some(element) = self.element_mut(id) {
            element.listeners.push(ListenerSlot {
                event,
                options,
                handler,
            });
        }
        Ok(true)
    }

    pub fn remove_event_listener(
        &mut self,
        id: NodeId,
        event: EventType,
        capture: bool,
        handler: &EventHandler,
    ) -> EngineResult<bool> {
        self.require(id)?;
        let mut removed = false;
        if let Some(element) = self.element_mut(id) {
            let before = element.listeners.len();
            element.listeners.retain(|slot| {
                !(slot.event == event
                    && slot.options.capture == capture
                    && Rc::ptr_eq(&slot.handler, handler))
            });
            removed = element.listeners.len() != before;
        }
        Ok(removed)
    }

    pub fn listener_count(&self, id: NodeId, event: EventType) -> usize {
        match self.element(id) {
            Some(element) => element
                .listeners
                .iter()
                .filter(|slot| slot.event == event)
                .count(),
            None => 0,
        }
    }

    /// Dispatches an event at `target`: capture phase from the top of the
    /// tree down, then bubble from the target back up.
    pub fn dispatch_event(&self, target: NodeId, event: EventType) -> EngineResult<EventState> {
        self.require(target)?;

        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }

        let mut state = EventState::new(event, target);
        for &node in path.iter().rev() {
            self.run_listeners(node, &mut state, true);
            if state.propagation_stopped() {
                return Ok(state);
            }
        }
        for &node in path.iter() {
            self.run_listeners(node, &mut state, false);
            if state.propagation_stopped() {
                return Ok(state);
            }
        }
        Ok(state)
    }

    fn run_listeners(&self, node: NodeId, state: &mut EventState, capture: bool) {
        let slots: Vec<(EventHandler, bool)> = match self.element(node) {
            Some(element) => element
                .listeners
                .iter()
                .filter(|slot| slot.event == state.event && slot.options.capture == capture)
                .map(|slot| (Rc::clone(&slot.handler), slot.options.passive))
                .collect(),
            None => return,
        };

        for (handler, passive) in slots {
            if state.immediate_stopped() {
                return;
            }
            let prevented = state.default_prevented();
            handler(state);
            if passive {
                // Passive listeners cannot cancel the default action.
                state.restore_default(prevented);
            }
        }
    }

    // ---- observation -------------------------------------------------------

    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> EngineResult<ObserverId> {
        self.require(target)?;
        let id = self.next_observer;
        self.next_observer = self.next_observer.saturating_add(1);
        self.observers.push(ObserverSlot {
            id,
            target,
            options,
            queue: Vec::new(),
        });
        Ok(id)
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|slot| slot.id != id);
        self.observers.len() != before
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| std::mem::take(&mut slot.queue))
            .unwrap_or_default()
    }

    fn route_record(&mut self, record: MutationRecord) {
        let mut accepting = Vec::new();
        for (index, slot) in self.observers.iter().enumerate() {
            if !slot.wants(&record.kind) {
                continue;
            }
            let in_scope = record.target == slot.target
                || (slot.options.subtree && self.is_inclusive_ancestor(slot.target, record.target));
            if in_scope {
                accepting.push(index);
            }
        }
        for index in accepting {
            self.observers[index].queue.push(record.clone());
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
