use crate::services::attempts::{AttemptRecord, SessionStats};

pub const EMPTY_TRANSCRIPT: &str = "Sin datos de sesión.";

/// Compact transcript handed to the model: history, statistics and the misses.
pub fn format_transcript(rows: &[AttemptRecord], stats: &SessionStats) -> String {
    if rows.is_empty() {
        return EMPTY_TRANSCRIPT.to_string();
    }

    let history = rows
        .iter()
        .map(|r| {
            format!(
                "{}x{}:{}",
                r.factor_a,
                r.factor_b,
                if r.is_correct { "Si" } else { "No" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!("Historial: {}\n", history);
    out.push_str(&format!(
        "ESTADÍSTICAS: Total={}, Correctas={}, Precisión={}%, TiempoPromedio={}ms\n",
        stats.total, stats.correct, stats.accuracy, stats.avg_time
    ));

    let errors: Vec<String> = rows
        .iter()
        .filter(|r| !r.is_correct)
        .map(|r| {
            let input = r
                .user_input
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}x{}={}(respondió:{})",
                r.factor_a, r.factor_b, r.correct_result, input
            )
        })
        .collect();
    if !errors.is_empty() {
        out.push_str("ERRORES: ");
        out.push_str(&errors.join(", "));
    }

    out
}

const STRUCTURED_SUFFIX: &str = r#"
Formato de salida:
Responde ÚNICAMENTE con un objeto JSON con estas cuatro claves de texto:
{"resumen_general": "...", "patron_errores": "...", "plan_accion": "...", "sugerencia_entrenamiento": "..."}"#;

/// Wraps the transcript in the coaching instructions.
pub fn build_prompt(transcript: &str, structured: bool) -> String {
    let mut prompt = format!(
        "Actúa como un experto en neuroeducación.
Contexto: Usuario entrenando tablas de multiplicar.
Datos: {transcript}

Instrucciones:
- Responde en 3 párrafos cortos (Máximo 150 palabras total).
- Párrafo 1: Refuerzo positivo del progreso.
- Párrafo 2: Identificación de \"puntos de fricción\" (ej. tabla del 7).
- Párrafo 3: Prescripción de ejercicios de ESCRITURA MANUAL.

Reglas de Tono y Formato:
1. TONO: Debe ser SIEMPRE positivo, pedagógico y motivador. Si hay errores, enfócalos como oportunidades de mejora.
2. NO uses emoticones ni emojis.
3. Responde en español."
    );
    if structured {
        prompt.push_str(STRUCTURED_SUFFIX);
    }
    prompt
}
