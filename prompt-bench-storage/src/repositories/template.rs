use async_trait::async_trait;
use prompt_bench_core::domain::{EvaluationTemplate, TemplateId};
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::TemplateStore;
use validator::Validate;

use crate::memory::InMemoryStore;

#[async_trait]
impl TemplateStore for InMemoryStore {
    /// Rejects templates with an empty name, body or model.
    async fn save_template(&self, template: &EvaluationTemplate) -> Result<()> {
        template.validate()?;
        self.templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, template_id: &TemplateId) -> Result<Option<EvaluationTemplate>> {
        Ok(self.templates.get(template_id).map(|t| t.value().clone()))
    }

    /// Active templates, oldest first, then by name.
    async fn list_active_templates(&self) -> Result<Vec<EvaluationTemplate>> {
        let mut templates: Vec<EvaluationTemplate> = self
            .templates
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.value().clone())
            .collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(templates)
    }
}
