//! Reversed-domain trie for exact and hierarchical domain matching.
//!
//! Domains are stored character-reversed (`tempmail.com` is walked as
//! `moc.liampmet`), so the root's children are the last characters of the
//! TLD and a prefix walk over a reversed query visits every ancestor domain
//! of that query before the query itself.

use ahash::AHashMap;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Node {
    children: AHashMap<char, Node>,
    /// A stored domain ends at this node.
    terminal: bool,
}

#[derive(Debug, Default)]
struct Inner {
    root: Node,
    size: usize,
}

/// Thread-safe set of domains supporting subdomain matching.
///
/// Writers (`insert`, `clear`) take the internal lock exclusively, readers
/// share it.
///
/// # Examples
/// ```
/// use disposable::DomainTrie;
///
/// let trie = DomainTrie::new();
/// trie.insert("tempmail.com");
///
/// assert!(trie.contains_exact("tempmail.com"));
/// assert!(trie.contains_hierarchical("mail.tempmail.com"));
/// assert!(!trie.contains_hierarchical("nottempmail.com"));
/// ```
#[derive(Debug, Default)]
pub struct DomainTrie {
    inner: RwLock<Inner>,
}

impl DomainTrie {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from a list of domains.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trie = Self::new();
        trie.extend(domains);
        trie
    }

    /// Insert a domain. Empty input is ignored and re-inserting is a no-op.
    pub fn insert(&self, domain: &str) {
        if domain.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        let Inner { root, size } = &mut *inner;

        let mut node = root;
        for c in domain.chars().rev() {
            node = node.children.entry(c).or_default();
        }

        if !node.terminal {
            node.terminal = true;
            *size += 1;
        }
    }

    /// Insert every domain from an iterator under a single write lock.
    pub fn extend<I, S>(&self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.write();
        let Inner { root, size } = &mut *inner;

        for domain in domains {
            let domain = domain.as_ref();
            if domain.is_empty() {
                continue;
            }
            let mut node = &mut *root;
            for c in domain.chars().rev() {
                node = node.children.entry(c).or_default();
            }
            if !node.terminal {
                node.terminal = true;
                *size += 1;
            }
        }
    }

    /// Check whether exactly this domain was inserted.
    pub fn contains_exact(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }

        let inner = self.inner.read();
        let mut node = &inner.root;
        for c in domain.chars().rev() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    /// Check whether the domain or any of its parent domains was inserted.
    ///
    /// Matching happens on label boundaries only: with `tempmail.com`
    /// stored, `a.tempmail.com` matches but `nottempmail.com` does not.
    /// The walk stops at the first (shortest) stored ancestor.
    pub fn contains_hierarchical(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }

        let inner = self.inner.read();
        let mut node = &inner.root;
        let mut chars = domain.chars().rev().peekable();

        while let Some(c) = chars.next() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return false,
            }
            if node.terminal && (c == '.' || matches!(chars.peek(), None | Some('.'))) {
                return true;
            }
        }

        false
    }

    /// Number of stored domains.
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Returns true if no domains are stored.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Collect every stored domain. Order is unspecified.
    pub fn enumerate(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut domains = Vec::with_capacity(inner.size);

        // (node, reversed path leading to it)
        let mut stack: Vec<(&Node, String)> = vec![(&inner.root, String::new())];
        while let Some((node, path)) = stack.pop() {
            if node.terminal {
                domains.push(path.chars().rev().collect());
            }
            for (c, child) in &node.children {
                let mut next = String::with_capacity(path.len() + c.len_utf8());
                next.push_str(&path);
                next.push(*c);
                stack.push((child, next));
            }
        }

        domains
    }

    /// Remove all domains.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        *inner = Inner::default();
    }
}
