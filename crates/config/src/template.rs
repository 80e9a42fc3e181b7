//! Default configuration template with all options documented.
//!
//! Written by `streambot config init`. Every option is listed so operators
//! can see what is configurable without reading the schema.

/// Generate the default TOML config template with a specific port.
pub fn default_config_template(port: u16) -> String {
    format!(
        r##"# Streambot Configuration
# ======================
# Changes require a restart to take effect.
#
# Environment variable substitution is supported: ${{ENV_VAR}} and
# ${{ENV_VAR:-default}}.
# Example: app_secret = "${{FEISHU_APP_SECRET}}"

# ══════════════════════════════════════════════════════════════════════════════
# SERVER
# ══════════════════════════════════════════════════════════════════════════════

[server]
bind = "0.0.0.0"                  # Feishu must be able to reach the callback routes
port = {port}

# ══════════════════════════════════════════════════════════════════════════════
# FEISHU
# ══════════════════════════════════════════════════════════════════════════════
# Event subscription URL:  http(s)://<host>/feishu/event
# Card callback URL:       http(s)://<host>/feishu/card

[bot.feishu]
enable = true
app_id = "${{FEISHU_APP_ID}}"
app_secret = "${{FEISHU_APP_SECRET}}"
app_verification_token = "${{FEISHU_VERIFICATION_TOKEN:-}}"
bot_name = "streambot"            # Group messages must @mention exactly this name
assistant_name = "DeepSeek"       # Shown in tip card headers
# base_url = "https://open.feishu.cn/open-apis"
# finalize_delay_ms = 500         # Settle time before leaving streaming mode
# card_link = "https://example.com"

# ══════════════════════════════════════════════════════════════════════════════
# AI PROVIDERS
# ══════════════════════════════════════════════════════════════════════════════
# When `default` is unset, OpenAI is used if enabled, else Volc.

[ai]
# default = "volc"

[ai.volc]
enable = false
api_key = "${{VOLC_API_KEY:-}}"
model = ""                        # Ark bot ID
# api_url = "https://ark.cn-beijing.volces.com/api/v3"

[ai.openai]
enable = false
api_key = "${{OPENAI_API_KEY:-}}"
model = "gpt-4o-mini"
# api_url = "https://api.openai.com/v1"

# ══════════════════════════════════════════════════════════════════════════════
# SESSIONS
# ══════════════════════════════════════════════════════════════════════════════

[session]
ttl_secs = 43200                  # Conversation idle lifetime (12h)
max_context_len = 16384           # Budget for one conversation, bytes of JSON
dedup_ttl_secs = 36000            # How long delivered message IDs are remembered (10h)

# ══════════════════════════════════════════════════════════════════════════════
# STREAMING
# ══════════════════════════════════════════════════════════════════════════════

[stream]
tick_ms = 700                     # Card refresh cadence while streaming
idle_timeout_secs = 10            # Give up when the provider sends nothing
"##
    )
}
