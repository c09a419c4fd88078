use crate::contract::models::ContractRequest;

/// Builds the drafting prompt sent to every provider.
pub fn build_prompt(request: &ContractRequest) -> String {
    format!(
        "Generate a professional {contract_type} legal document. \
        The agreement is between {company} (Disclosing Party) and {client} (Receiving Party). \
        The jurisdiction for this contract is {jurisdiction}. \
        Include the following specific requirements: {extra}. \
        The contract should be formal, legally structured, and include standard clauses for {contract_type}.",
        contract_type = request.contract_type,
        company = request.company_name,
        client = request.client_name,
        jurisdiction = request.jurisdiction,
        extra = request.extra_clauses,
    )
}

/// Strips the prompt wherever the model echoed it, then trims whitespace.
pub fn clean_output(generated: &str, prompt: &str) -> String {
    if prompt.is_empty() {
        return generated.trim().to_string();
    }
    generated.replace(prompt, "").trim().to_string()
}
