//! Sources seeded into new projects and new buffer passes.

pub const HELP_TEXT: &str = r"multipass shader sandbox

Every pass defines:
    void mainImage(out vec4 fragColor, in vec2 fragCoord)

Uniforms available to every pass:
    vec3  iResolution   surface size in pixels (z = 1)
    float iTime         seconds of playback, scaled by the time scale
    float iTimeDelta    wall-clock seconds since the previous tick
    int   iFrame        ticks elapsed while playing
    vec4  iDate         year, month, day, seconds since midnight
    vec4  iMouse        xy = pointer, zw = press position (negative once released)

Channels:
    buffer N   iChannel0 = its own previous frame
               iChannel1..3 = buffers 0..2 from this frame, when they come earlier
    finalPass  iChannel0..3 = buffers 0..3 from this frame
    all passes iTexChannel0..7 = project textures, in list order

Unbound channels sample a 1x1 white texture.
";

pub const DEFAULT_BUFFER_A_SOURCE: &str = r"// Buffer A: drifting sparks that leave fading trails.
// iChannel0 is this buffer's previous frame.
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution.xy;
    float keep = iTime < 0.1 ? 0.0 : 0.96;
    vec3 trail = texture(iChannel0, uv).rgb * keep;

    float aspect = iResolution.x / iResolution.y;
    vec2 p = vec2(uv.x * aspect, uv.y);
    vec3 sparks = vec3(0.0);
    for (int i = 0; i < 5; i++) {
        float fi = float(i);
        vec2 orbit = vec2(cos(iTime * (0.7 + 0.13 * fi) + fi),
                          sin(iTime * (0.9 + 0.11 * fi) + 2.0 * fi));
        vec2 center = vec2(0.5 * aspect, 0.5) + 0.3 * orbit;
        vec2 d = p - center;
        float glow = 0.002 / max(dot(d, d), 0.0001);
        sparks += glow * (0.5 + 0.5 * cos(vec3(0.0, 2.0, 4.0) + fi + iTime));
    }

    if (iMouse.z > 0.0) {
        vec2 d = p - iMouse.xy / iResolution.y;
        sparks += vec3(0.004 / max(dot(d, d), 0.0001));
    }

    fragColor = vec4(min(trail + sparks * 0.1, vec3(1.0)), 1.0);
}
";

pub const DEFAULT_BUFFER_B_SOURCE: &str = r"// Buffer B: soft bloom of Buffer A.
// iChannel1 is Buffer A from this frame.
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 texel = 1.0 / iResolution.xy;
    vec2 uv = fragCoord * texel;
    vec3 sum = vec3(0.0);
    float weight = 0.0;
    for (int x = -3; x <= 3; x++) {
        for (int y = -3; y <= 3; y++) {
            float w = exp(-float(x * x + y * y) / 8.0);
            sum += texture(iChannel1, uv + vec2(float(x), float(y)) * texel * 2.0).rgb * w;
            weight += w;
        }
    }
    fragColor = vec4(sum / weight, 1.0);
}
";

pub const DEFAULT_FINAL_SOURCE: &str = r"// Final pass: iChannel0 is Buffer A, iChannel1 is Buffer B.
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution.xy;
    vec3 base = texture(iChannel0, uv).rgb;
    vec3 bloom = texture(iChannel1, uv).rgb;
    vec3 color = base + bloom * 0.8;
    color *= 1.0 - smoothstep(0.3, 1.2, length(uv - 0.5));
    fragColor = vec4(pow(color, vec3(0.4545)), 1.0);
}
";

/// Starter source for a freshly appended buffer; `id` is e.g. `bufferC`.
pub fn new_buffer_source(id: &str) -> String {
    let label = id
        .strip_prefix("buffer")
        .map(|letter| format!("Buffer {letter}"))
        .unwrap_or_else(|| id.to_string());
    format!(
        r"// {label}: edit me.
// iChannel0 is this buffer's previous frame; iChannel1..3 are the buffers before it.
void mainImage(out vec4 fragColor, in vec2 fragCoord) {{
    vec2 uv = fragCoord / iResolution.xy;
    vec3 color = 0.5 + 0.5 * cos(iTime + uv.xyx + vec3(0.0, 2.0, 4.0));
    fragColor = vec4(color, 1.0);
}}
"
    )
}
