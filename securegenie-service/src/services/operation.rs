//! The three generation operations and their fixed parameters.

use super::providers::GenerationParams;

/// Which template and response shape a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Policy,
    Compliance,
    Questionnaire,
}

/// Everything that differs between operations.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub path: &'static str,
    pub system_instruction: &'static str,
    pub response_field: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sent to the caller when the model call fails.
    pub failure_message: &'static str,
    /// Returned as a successful payload when the model answers with
    /// something other than text.
    pub fallback_text: &'static str,
}

const POLICY: OperationSpec = OperationSpec {
    name: "policy",
    path: "/generate-policy",
    system_instruction: "You are a cybersecurity expert specializing in creating comprehensive \
        security policies for organizations. Generate professional, compliance-ready security \
        policies that are detailed, actionable, and industry-specific.",
    response_field: "policy",
    max_tokens: 4000,
    temperature: 0.7,
    failure_message: "Failed to generate security policy. Please try again.",
    fallback_text: "Failed to generate policy",
};

const COMPLIANCE: OperationSpec = OperationSpec {
    name: "compliance",
    path: "/analyze-compliance",
    system_instruction: "You are a compliance expert with deep knowledge of regulatory \
        frameworks including GDPR, SOX, HIPAA, ISO 27001, PCI DSS, and industry-specific \
        regulations. Provide detailed, actionable compliance analysis with specific \
        remediation steps.",
    response_field: "analysis",
    max_tokens: 4000,
    temperature: 0.3,
    failure_message: "Failed to analyze compliance gaps. Please try again.",
    fallback_text: "Failed to generate analysis",
};

const QUESTIONNAIRE: OperationSpec = OperationSpec {
    name: "questionnaire",
    path: "/fill-questionnaire",
    system_instruction: "You are a security consultant expert at filling out vendor security \
        questionnaires and RFPs. Provide accurate, professional responses based on the company \
        information provided. Be thorough and precise in your answers.",
    response_field: "responses",
    max_tokens: 4000,
    temperature: 0.2,
    failure_message: "Failed to fill questionnaire. Please try again.",
    fallback_text: "Failed to generate responses",
};

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::Policy,
        Operation::Compliance,
        Operation::Questionnaire,
    ];

    pub fn spec(self) -> &'static OperationSpec {
        match self {
            Operation::Policy => &POLICY,
            Operation::Compliance => &COMPLIANCE,
            Operation::Questionnaire => &QUESTIONNAIRE,
        }
    }

    pub fn generation_params(self) -> GenerationParams {
        let spec = self.spec();
        GenerationParams {
            max_tokens: spec.max_tokens,
            temperature: spec.temperature,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().name)
    }
}
