//! Prompt construction for each operation.
//!
//! Request fields are interpolated verbatim: no escaping, trimming or length
//! limits. Building a prompt cannot fail.

use super::operation::Operation;
use crate::models::{ComplianceRequest, PolicyRequest, QuestionnaireRequest};

/// Placeholder for optional fields the caller left out.
pub const MISSING_FIELD_PLACEHOLDER: &str = "None";

/// The two halves of a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instruction: &'static str,
    pub user_prompt: String,
}

/// A request body that maps onto one operation's template.
pub trait PromptTemplate {
    const OPERATION: Operation;

    fn render(&self) -> String;
}

/// Build the system instruction and user turn for a request.
pub fn build<T: PromptTemplate>(request: &T) -> Prompt {
    Prompt {
        system_instruction: T::OPERATION.spec().system_instruction,
        user_prompt: request.render(),
    }
}

impl PromptTemplate for PolicyRequest {
    const OPERATION: Operation = Operation::Policy;

    fn render(&self) -> String {
        let requirements = self
            .specific_requirements
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(MISSING_FIELD_PLACEHOLDER);

        format!(
            "Generate a comprehensive security policy for:
Company: {company}
Industry: {industry}
Size: {size} employees
Additional Requirements: {requirements}

Create a professional, actionable security policy covering:
1. Information Security Governance
2. Access Control
3. Data Protection
4. Incident Response
5. Employee Security Training
6. Physical Security
7. Network Security
8. Business Continuity

Format as a structured document with clear sections and actionable guidelines.",
            company = self.company_name,
            industry = self.industry,
            size = self.size,
        )
    }
}

impl PromptTemplate for ComplianceRequest {
    const OPERATION: Operation = Operation::Compliance;

    fn render(&self) -> String {
        format!(
            "Analyze compliance gaps for:
Framework: {framework}
Current Setup: {setup}
Industry: {industry}

Provide:
1. Current compliance status assessment
2. Identified gaps and vulnerabilities
3. Risk level for each gap (High/Medium/Low)
4. Specific remediation steps
5. Priority order for addressing gaps
6. Estimated timeline for compliance

Be specific and actionable in recommendations.",
            framework = self.framework,
            setup = self.current_setup,
            industry = self.industry,
        )
    }
}

impl PromptTemplate for QuestionnaireRequest {
    const OPERATION: Operation = Operation::Questionnaire;

    fn render(&self) -> String {
        format!(
            "Fill out this security questionnaire based on the company information provided:

Company Information:
{company_info}

Questionnaire:
{questionnaire}

Provide:
1. Complete answers to all questions
2. Professional, compliant responses
3. Mark any questions that need manual review as \"[REQUIRES REVIEW]\"
4. Include supporting explanations where appropriate

Format responses clearly for each question.",
            company_info = self.company_info,
            questionnaire = self.questionnaire,
        )
    }
}
