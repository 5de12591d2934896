//! The fixed, category-grouped tag vocabulary.
//!
//! Three required categories ("Modality/Task", "Architecture",
//! "Techniques") with a concrete tag list for a machine-learning-paper
//! corpus, chosen to be broad enough that most papers have an honest
//! answer in each required category.

/// Identifies a category. `ModalityTask` and `Architecture` each require
/// at least one tag; `Techniques` is recommended but not mandatory;
/// `Other` covers everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ModalityTask,
    Architecture,
    Techniques,
    Other,
}

/// One category of the vocabulary and its fixed tag list.
pub struct CategoryGroup {
    pub name: &'static str,
    pub kind: Category,
    pub tags: &'static [&'static str],
}

/// The full vocabulary, grouped by category.
pub static TAG_VOCABULARY: &[CategoryGroup] = &[
    CategoryGroup {
        name: "Modality/Task",
        kind: Category::ModalityTask,
        tags: &[
            "Text",
            "Vision",
            "Audio",
            "Video",
            "Multimodal",
            "Tabular",
            "Graph",
            "Code",
            "Robotics",
            "Time Series",
            "Reinforcement Learning",
            "Classification",
            "Generation",
            "Retrieval",
            "Translation",
            "Summarization",
            "Question Answering",
        ],
    },
    CategoryGroup {
        name: "Architecture",
        kind: Category::Architecture,
        tags: &[
            "Transformer",
            "Convolutional Network",
            "Recurrent Network",
            "Graph Neural Network",
            "Diffusion Model",
            "State Space Model",
            "Mixture of Experts",
            "Autoencoder",
            "GAN",
            "Retrieval-Augmented",
            "Hybrid Architecture",
        ],
    },
    CategoryGroup {
        name: "Techniques",
        kind: Category::Techniques,
        tags: &[
            "Fine-tuning",
            "Pretraining",
            "Self-Supervised Learning",
            "Contrastive Learning",
            "Knowledge Distillation",
            "Quantization",
            "Pruning",
            "Prompt Engineering",
            "In-Context Learning",
            "Chain-of-Thought",
            "RLHF",
            "Data Augmentation",
            "Transfer Learning",
            "Few-Shot Learning",
            "Zero-Shot Learning",
        ],
    },
    CategoryGroup {
        name: "Evaluation",
        kind: Category::Other,
        tags: &["Benchmark", "Ablation Study", "Human Evaluation", "Theoretical Analysis"],
    },
];

/// Returns `true` if `tag` appears verbatim in the vocabulary.
#[must_use]
pub fn is_known_tag(tag: &str) -> bool {
    TAG_VOCABULARY.iter().any(|category| category.tags.contains(&tag))
}

/// Returns the category `tag` belongs to, or `None` if it isn't in the
/// vocabulary.
#[must_use]
pub fn category_of(tag: &str) -> Option<Category> {
    TAG_VOCABULARY.iter().find(|category| category.tags.contains(&tag)).map(|category| category.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_is_unique_across_the_vocabulary() {
        let mut seen = std::collections::HashSet::new();
        for category in TAG_VOCABULARY {
            for tag in category.tags {
                assert!(seen.insert(*tag), "duplicate tag '{tag}' across categories");
            }
        }
    }

    #[test]
    fn known_tags_resolve_to_their_category() {
        assert_eq!(category_of("Transformer"), Some(Category::Architecture));
        assert_eq!(category_of("Text"), Some(Category::ModalityTask));
        assert_eq!(category_of("Not A Tag"), None);
    }
}
