pub const EXTRACT_SYSTEM: &str =
    "You are a helpful AI that extracts structured data from job descriptions.";

pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the following fields from the given job description. If a field is not found, leave it as an empty string.
Also return a skills_required array of skills relevant to the given job description.
For "job_description_ai", return a single string containing:
- A summary paragraph of the role.
- A section titled "Roles and Responsibilities" as a bullet list.
- A section titled "Requirements" as a bullet list (if applicable).
Return data in the following JSON format, without markdown or code blocks:

{
  "role": "",
  "experience": "",
  "seniority_level": "",
  "employment_type": "",
  "workplace_type": "",
  "country": "",
  "city": "",
  "currency": "",
  "from_salary": "",
  "to_salary": "",
  "frequency": "",
  "compensation": "",
  "job_description_ai": "",
  "skills_required": []
}

Job Description:
"""
{job_description}
"""
"#;
