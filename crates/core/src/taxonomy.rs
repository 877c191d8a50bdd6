//! Graduate computer-science syllabus used to parameterize prompts.

/// Sentinel topic letting the model pick any area of the syllabus.
pub const RANDOM_TOPIC: &str = "Random";

/// Subtopic used in prompts when none is given.
pub const GENERAL_SUBTOPIC: &str = "General";

const SYLLABUS: &[(&str, &[&str])] = &[
    (
        "Algorithms",
        &[
            "Sorting",
            "Graph Algorithms",
            "Dynamic Programming",
            "Greedy Algorithms",
            "Amortized Analysis",
            "Randomized Algorithms",
            "Approximation Algorithms",
        ],
    ),
    (
        "Data Structures",
        &[
            "Balanced Search Trees",
            "Heaps",
            "Hash Tables",
            "Tries",
            "Union-Find",
            "Persistent Data Structures",
        ],
    ),
    (
        "Theory of Computation",
        &[
            "Automata",
            "Context-Free Languages",
            "Turing Machines",
            "Decidability",
            "Complexity Classes",
            "NP-Completeness",
        ],
    ),
    (
        "Operating Systems",
        &[
            "Processes and Threads",
            "Scheduling",
            "Virtual Memory",
            "File Systems",
            "Synchronization",
            "Deadlocks",
        ],
    ),
    (
        "Computer Architecture",
        &[
            "Pipelining",
            "Cache Hierarchies",
            "Instruction Set Design",
            "Branch Prediction",
            "Memory Consistency",
            "Multicore Processors",
        ],
    ),
    (
        "Computer Networks",
        &[
            "Transport Protocols",
            "Routing",
            "Congestion Control",
            "Link Layer",
            "Network Security",
            "Software-Defined Networking",
        ],
    ),
    (
        "Databases",
        &[
            "Relational Algebra",
            "Query Optimization",
            "Transactions",
            "Concurrency Control",
            "Indexing",
            "Recovery",
        ],
    ),
    (
        "Distributed Systems",
        &[
            "Consensus",
            "Replication",
            "Clocks and Ordering",
            "Fault Tolerance",
            "Distributed Transactions",
            "CAP Theorem",
        ],
    ),
    (
        "Compilers",
        &[
            "Lexical Analysis",
            "Parsing",
            "Type Systems",
            "Intermediate Representations",
            "Register Allocation",
            "Optimization Passes",
        ],
    ),
    (
        "Programming Languages",
        &[
            "Lambda Calculus",
            "Semantics",
            "Functional Programming",
            "Memory Management",
            "Concurrency Models",
        ],
    ),
    (
        "Cryptography",
        &[
            "Symmetric Ciphers",
            "Public-Key Cryptography",
            "Hash Functions",
            "Digital Signatures",
            "Zero-Knowledge Proofs",
        ],
    ),
    (
        "Machine Learning",
        &[
            "Supervised Learning",
            "Neural Networks",
            "Probabilistic Models",
            "Learning Theory",
            "Reinforcement Learning",
        ],
    ),
    (
        "Software Engineering",
        &[
            "Design Patterns",
            "Testing",
            "Formal Verification",
            "Software Architecture",
            "Version Control",
        ],
    ),
];

/// All topic names, in syllabus order.
pub fn topics() -> impl Iterator<Item = &'static str> {
    SYLLABUS.iter().map(|(topic, _)| *topic)
}

/// Subtopics of `topic`, or `None` when the topic is not in the syllabus.
#[must_use]
pub fn subtopics(topic: &str) -> Option<&'static [&'static str]> {
    SYLLABUS
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, subs)| *subs)
}

#[must_use]
pub fn contains_topic(topic: &str) -> bool {
    subtopics(topic).is_some()
}

#[must_use]
pub fn entries() -> &'static [(&'static str, &'static [&'static str])] {
    SYLLABUS
}
