//! Built-in template catalog

use async_trait::async_trait;

use super::{EntityStoreError, TemplateCatalog, TemplateInfo};
use crate::package::PackageTier;
use crate::types::{Category, TemplateId};

/// (id, name, categories, required tier)
const BUILTIN_TEMPLATES: &[(&str, &str, &[Category], PackageTier)] = &[
    (
        "classic-ivory",
        "Classic Ivory",
        &[Category::Wedding, Category::Engagement, Category::Anniversary],
        PackageTier::Basic,
    ),
    (
        "garden-romance",
        "Garden Romance",
        &[Category::Wedding, Category::Engagement],
        PackageTier::Basic,
    ),
    (
        "royal-gold",
        "Royal Gold",
        &[Category::Wedding, Category::Anniversary],
        PackageTier::Gold,
    ),
    (
        "confetti-pop",
        "Confetti Pop",
        &[Category::Birthday, Category::Graduation],
        PackageTier::Basic,
    ),
    (
        "starlight-gala",
        "Starlight Gala",
        &[Category::Birthday, Category::Corporate, Category::Anniversary],
        PackageTier::Gold,
    ),
    (
        "little-clouds",
        "Little Clouds",
        &[Category::BabyShower],
        PackageTier::Basic,
    ),
    (
        "cap-and-gown",
        "Cap and Gown",
        &[Category::Graduation],
        PackageTier::Basic,
    ),
    (
        "boardroom",
        "Boardroom",
        &[Category::Corporate],
        PackageTier::Basic,
    ),
    (
        "simple-card",
        "Simple Card",
        &[
            Category::Wedding,
            Category::Engagement,
            Category::Birthday,
            Category::BabyShower,
            Category::Anniversary,
            Category::Graduation,
            Category::Corporate,
            Category::Other,
        ],
        PackageTier::Basic,
    ),
];

/// In-process catalog backed by a fixed template list
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    templates: Vec<TemplateInfo>,
}

impl StaticCatalog {
    pub fn new(templates: Vec<TemplateInfo>) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Self {
        let templates = BUILTIN_TEMPLATES
            .iter()
            .map(|(id, name, categories, tier)| TemplateInfo {
                id: TemplateId::new(*id),
                name: (*name).to_string(),
                categories: categories.to_vec(),
                required_tier: *tier,
            })
            .collect();
        Self::new(templates)
    }

    pub fn find(&self, id: &TemplateId) -> Option<&TemplateInfo> {
        self.templates.iter().find(|t| &t.id == id)
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl TemplateCatalog for StaticCatalog {
    async fn templates(
        &self,
        category: Category,
        tier: Option<PackageTier>,
    ) -> Result<Vec<TemplateInfo>, EntityStoreError> {
        Ok(self
            .templates
            .iter()
            .filter(|t| t.supports(category))
            .filter(|t| tier.map_or(true, |tier| t.required_tier <= tier))
            .cloned()
            .collect())
    }

    async fn template_tier(
        &self,
        id: &TemplateId,
    ) -> Result<Option<PackageTier>, EntityStoreError> {
        Ok(self.find(id).map(|t| t.required_tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filters_by_category() {
        let catalog = StaticCatalog::builtin();
        let templates = catalog.templates(Category::BabyShower, None).await.unwrap();
        let ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["little-clouds", "simple-card"]);
    }

    #[tokio::test]
    async fn test_tier_filter_hides_gold_for_basic() {
        let catalog = StaticCatalog::builtin();

        let basic = catalog
            .templates(Category::Wedding, Some(PackageTier::Basic))
            .await
            .unwrap();
        assert!(basic.iter().all(|t| t.required_tier == PackageTier::Basic));

        let gold = catalog
            .templates(Category::Wedding, Some(PackageTier::Gold))
            .await
            .unwrap();
        assert!(gold.iter().any(|t| t.id.as_str() == "royal-gold"));
        assert!(gold.len() > basic.len());
    }

    #[tokio::test]
    async fn test_template_tier_lookup() {
        let catalog = StaticCatalog::builtin();
        assert_eq!(
            catalog
                .template_tier(&TemplateId::new("royal-gold"))
                .await
                .unwrap(),
            Some(PackageTier::Gold)
        );
        assert_eq!(
            catalog
                .template_tier(&TemplateId::new("nope"))
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_every_category_has_a_basic_template() {
        let catalog = StaticCatalog::builtin();
        for category in Category::all() {
            assert!(
                catalog
                    .templates
                    .iter()
                    .any(|t| t.supports(*category) && t.required_tier == PackageTier::Basic),
                "no basic template for {}",
                category
            );
        }
    }
}
